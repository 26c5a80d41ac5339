use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use crate::handlers::bearer_token;
use crate::models::dashboard::DashboardResponse;
use crate::models::error::ErrorResponse;
use crate::AppState;

/// Handler for GET /api/dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = state
        .auth
        .user_for_token(bearer_token(&headers).as_deref())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "authentication required".to_string(),
            }),
        ))?;

    let dashboard = state.dashboard.build(user_id).await.map_err(|e| {
        tracing::error!("Failed to build dashboard: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e.to_string() }),
        )
    })?;

    Ok(Json(dashboard))
}
