pub mod auth;
pub mod dashboard;
pub mod flow;
pub mod investments;
pub mod prices;
pub mod stakes;
pub mod withdrawals;

use axum::http::{header, HeaderMap};

/// Opaque session token from the Authorization header, if present.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc-123"),
        );
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn missing_or_malformed_header_yields_none() {
        assert!(bearer_token(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("abc-123"));
        assert!(bearer_token(&headers).is_none());
    }
}
