use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use crate::handlers::bearer_token;
use crate::models::error::ErrorResponse;
use crate::models::withdrawal::{SubmitWithdrawalRequest, WithdrawalRecord, WithdrawalsResponse};
use crate::services::withdrawals::WithdrawalError;
use crate::AppState;

fn map_error(e: WithdrawalError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        WithdrawalError::Unauthenticated => StatusCode::UNAUTHORIZED,
        WithdrawalError::InvalidAmount | WithdrawalError::InvalidAddress => StatusCode::BAD_REQUEST,
        WithdrawalError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

/// Handler for POST /api/withdrawals
pub async fn submit_withdrawal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitWithdrawalRequest>,
) -> Result<(StatusCode, Json<WithdrawalRecord>), (StatusCode, Json<ErrorResponse>)> {
    let user = state.auth.user_for_token(bearer_token(&headers).as_deref());
    let record = state
        .withdrawals
        .submit(user, &req.amount, &req.wallet_address)
        .map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Handler for GET /api/withdrawals
pub async fn get_withdrawals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<WithdrawalsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user = state.auth.user_for_token(bearer_token(&headers).as_deref());
    let withdrawals = state.withdrawals.list(user).map_err(map_error)?;
    Ok(Json(WithdrawalsResponse { withdrawals }))
}
