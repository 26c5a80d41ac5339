use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use crate::handlers::bearer_token;
use crate::models::error::ErrorResponse;
use crate::models::flow::{ConnectWalletRequest, ConvertRequest, FlowResponse};
use crate::services::investment_flow::FlowError;
use crate::AppState;

fn map_error(e: FlowError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        FlowError::Unauthenticated => StatusCode::UNAUTHORIZED,
        FlowError::ConnectionFailed => StatusCode::BAD_GATEWAY,
        FlowError::InvalidAmount | FlowError::BelowMinimum => StatusCode::BAD_REQUEST,
        FlowError::AlreadyPending | FlowError::InvalidStep => StatusCode::CONFLICT,
        FlowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

fn user(state: &AppState, headers: &HeaderMap) -> Option<uuid::Uuid> {
    state.auth.user_for_token(bearer_token(headers).as_deref())
}

/// Handler for GET /api/flow
pub async fn get_flow(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FlowResponse>, (StatusCode, Json<ErrorResponse>)> {
    let resp = state.flow.state(user(&state, &headers)).map_err(map_error)?;
    Ok(Json(resp))
}

/// Handler for POST /api/flow/connect
pub async fn connect_wallet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConnectWalletRequest>,
) -> Result<Json<FlowResponse>, (StatusCode, Json<ErrorResponse>)> {
    let resp = state
        .flow
        .connect_wallet(user(&state, &headers), &req.provider)
        .await
        .map_err(map_error)?;
    Ok(Json(resp))
}

/// Handler for POST /api/flow/convert
pub async fn convert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConvertRequest>,
) -> Result<Json<FlowResponse>, (StatusCode, Json<ErrorResponse>)> {
    let resp = state
        .flow
        .convert(user(&state, &headers), &req.eur_amount)
        .await
        .map_err(map_error)?;
    Ok(Json(resp))
}

/// Handler for POST /api/flow/confirm
/// Runs the simulated transfer and appends to the ledger on success.
pub async fn confirm_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FlowResponse>, (StatusCode, Json<ErrorResponse>)> {
    let resp = state
        .flow
        .confirm_transfer(user(&state, &headers))
        .await
        .map_err(map_error)?;
    Ok(Json(resp))
}

/// Handler for POST /api/flow/complete
/// Resets the flow back to step one so another investment can start.
pub async fn complete_flow(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FlowResponse>, (StatusCode, Json<ErrorResponse>)> {
    let resp = state.flow.reset(user(&state, &headers)).map_err(map_error)?;
    Ok(Json(resp))
}
