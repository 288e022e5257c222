//! Staff account management. Every route is admin only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use domains::{AppError, Capability, Role, UserId};
use serde::Deserialize;
use services::{CreateUser, EditUser};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, Authenticated};
use crate::handlers::ok;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub capabilities: Option<Vec<Capability>>,
}

/// Capabilities only mean something next to a role, so they travel together.
fn role_change(role: Option<String>, capabilities: Option<Vec<Capability>>) -> Result<Option<Role>, AppError> {
    match (role, capabilities) {
        (Some(role), caps) => Role::from_parts(&role, caps.unwrap_or_default()).map(Some),
        (None, Some(_)) => Err(AppError::Validation(
            "role is required when changing capabilities".into(),
        )),
        (None, None) => Ok(None),
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.accounts.list_users(&identity).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.accounts.get_user(&identity, id).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let role = Role::from_parts(&req.role, req.capabilities)?;
    let user = state
        .accounts
        .create_user(
            &identity,
            CreateUser {
                username: req.username,
                email: req.email,
                display_name: req.display_name,
                password: req.password,
                role,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, ok(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let edit = EditUser {
        display_name: req.display_name,
        email: req.email,
        role: role_change(req.role, req.capabilities)?,
        password: req.password,
    };
    Ok(ok(state.accounts.update_user(&identity, id, edit).await?))
}
