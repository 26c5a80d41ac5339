use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use crate::handlers::bearer_token;
use crate::models::auth::{
    AckResponse, PasswordResetRequest, SessionResponse, SignInRequest, SignUpRequest,
    SignUpResponse,
};
use crate::models::error::ErrorResponse;
use crate::services::auth::AuthError;
use crate::AppState;

fn map_error(e: AuthError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AuthError::InvalidEmail | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
        AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

/// Handler for POST /api/auth/signup
pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), (StatusCode, Json<ErrorResponse>)> {
    let resp = state
        .auth
        .sign_up(&req.email, &req.password, req.full_name)
        .await
        .map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// Handler for POST /api/auth/signin
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let session = state
        .auth
        .sign_in(&req.email, &req.password)
        .await
        .map_err(map_error)?;
    Ok(Json(session))
}

/// Handler for POST /api/auth/signout
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AckResponse>, (StatusCode, Json<ErrorResponse>)> {
    let token = bearer_token(&headers).ok_or_else(|| map_error(AuthError::Unauthenticated))?;
    state.auth.sign_out(&token).map_err(map_error)?;
    Ok(Json(AckResponse { success: true }))
}

/// Handler for GET /api/auth/session
pub async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let token = bearer_token(&headers).ok_or_else(|| map_error(AuthError::Unauthenticated))?;
    let session = state.auth.current_session(&token).map_err(map_error)?;
    Ok(Json(session))
}

/// Handler for POST /api/auth/reset-password
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<AckResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .auth
        .request_password_reset(&req.email)
        .await
        .map_err(map_error)?;
    Ok(Json(AckResponse { success: true }))
}
