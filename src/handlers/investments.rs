use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use rust_decimal::Decimal;

use crate::handlers::bearer_token;
use crate::models::error::ErrorResponse;
use crate::models::investment::{InvestmentView, InvestmentsResponse};
use crate::services::dashboard::growth_pct;
use crate::services::projection;
use crate::AppState;

fn unauthorized() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "authentication required".to_string(),
        }),
    )
}

/// Handler for GET /api/investments
/// Projected values are derived from the investment date at read time.
pub async fn get_investments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<InvestmentsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = state
        .auth
        .user_for_token(bearer_token(&headers).as_deref())
        .ok_or_else(unauthorized)?;

    let records = state.ledger.list(user_id).await.map_err(|e| {
        tracing::error!("Failed to list investments: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e.to_string() }),
        )
    })?;

    let now = state.clock.now();
    let investments: Vec<InvestmentView> = records
        .into_iter()
        .map(|r| {
            let projected_value = projection::projected_value(r.eur_value, r.created_at, now);
            InvestmentView {
                id: r.id,
                eth_amount: r.eth_amount,
                eur_value: r.eur_value,
                created_at: r.created_at,
                projected_value,
                growth_pct: growth_pct(r.eur_value, projected_value),
            }
        })
        .collect();

    let total_invested: Decimal = investments.iter().map(|v| v.eur_value).sum();
    let total_projected_value: Decimal = investments.iter().map(|v| v.projected_value).sum();

    Ok(Json(InvestmentsResponse {
        investments,
        total_invested,
        total_projected_value,
    }))
}
