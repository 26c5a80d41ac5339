use axum::{
    extract::{Path, State},
    http::HeaderMap,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::handlers::bearer_token;
use crate::models::error::ErrorResponse;
use crate::models::stake::{CreateStakeRequest, StakeRecord, StakeView, StakesResponse};
use crate::services::staking::{current_reward, StakeError};
use crate::AppState;

fn map_error(e: StakeError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        StakeError::Unauthenticated => StatusCode::UNAUTHORIZED,
        StakeError::InvalidAmount
        | StakeError::InvalidPeriod
        | StakeError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
        StakeError::NotUnlockable { .. } => StatusCode::CONFLICT,
        StakeError::NotFound => StatusCode::NOT_FOUND,
        StakeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

fn user(state: &AppState, headers: &HeaderMap) -> Option<Uuid> {
    state.auth.user_for_token(bearer_token(headers).as_deref())
}

/// Handler for POST /api/stakes
pub async fn create_stake(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateStakeRequest>,
) -> Result<(StatusCode, Json<StakeRecord>), (StatusCode, Json<ErrorResponse>)> {
    let stake = state
        .staking
        .create_stake(user(&state, &headers), &req.amount, req.period_days)
        .await
        .map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(stake)))
}

/// Handler for GET /api/stakes
pub async fn get_stakes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StakesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = user(&state, &headers).ok_or_else(|| map_error(StakeError::Unauthenticated))?;

    let stakes = state
        .staking
        .list_stakes(user_id)
        .await
        .map_err(|e| map_error(StakeError::Store(e)))?;
    let total_staked = state
        .staking
        .total_staked(user_id)
        .await
        .map_err(|e| map_error(StakeError::Store(e)))?;
    let available_balance = state
        .staking
        .available_balance(user_id)
        .await
        .map_err(|e| map_error(StakeError::Store(e)))?;

    let now = state.clock.now();
    let stakes: Vec<StakeView> = stakes
        .into_iter()
        .map(|stake| {
            let reward = current_reward(&stake, now);
            let days_left = (stake.unlock_date - now).num_days().max(0);
            StakeView {
                stake,
                current_reward: reward,
                days_left,
            }
        })
        .collect();

    Ok(Json(StakesResponse {
        stakes,
        total_staked,
        available_balance,
    }))
}

/// Handler for POST /api/stakes/{id}/unstake
pub async fn unstake(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(stake_id): Path<Uuid>,
) -> Result<Json<StakeRecord>, (StatusCode, Json<ErrorResponse>)> {
    let stake = state
        .staking
        .unstake(user(&state, &headers), stake_id)
        .await
        .map_err(map_error)?;
    Ok(Json(stake))
}
