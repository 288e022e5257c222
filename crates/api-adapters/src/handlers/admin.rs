//! Audit trail and blocklist administration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Authenticated};
use crate::handlers::ok;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn audit_logs(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.audit.list(&identity, page.limit, page.offset).await?))
}

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub address: String,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn list_blocked(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.blocklist.list(&identity).await?))
}

pub async fn block_ip(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiJson(req): ApiJson<BlockRequest>,
) -> ApiResult<impl IntoResponse> {
    let entry = state.blocklist.block(&identity, &req.address, req.reason).await?;
    Ok((StatusCode::CREATED, ok(entry)))
}

pub async fn unblock_ip(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    state.blocklist.unblock(&identity, id).await?;
    Ok(ok(json!({ "id": id })))
}
