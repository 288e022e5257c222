//! Login, session introspection and password recovery. All public except `me`.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::ApiResult;
use crate::extract::{ApiJson, Authenticated};
use crate::handlers::ok;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.accounts.login(&req.username, &req.password).await?;
    Ok(Json(json!({
        "success": true,
        "token": outcome.token,
        "user": outcome.user,
    })))
}

pub async fn me(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.accounts.profile(&identity).await?))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Unknown emails answer 404.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let ticket = state.resets.request_reset(&req.email).await?;
    info!(user = ticket.user_id, "password reset requested");
    Ok(Json(json!({
        "success": true,
        "message": "a reset link has been sent",
        "expires_at": ticket.expires_at,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    state.resets.complete_reset(&req.token, &req.password).await?;
    Ok(Json(json!({
        "success": true,
        "message": "password updated, sign in again",
    })))
}
