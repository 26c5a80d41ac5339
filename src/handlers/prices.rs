use axum::{extract::State, Json};

use crate::models::prices::PricesResponse;
use crate::AppState;

/// Handler for GET /api/prices
/// Serves the latest snapshot; never fails, worst case is a fallback quote.
pub async fn get_prices(State(state): State<AppState>) -> Json<PricesResponse> {
    let snapshot = state.prices.get_prices().await;

    Json(PricesResponse {
        prices: snapshot.table,
        fetched_at: snapshot.fetched_at,
        fallback: snapshot.fallback,
    })
}
