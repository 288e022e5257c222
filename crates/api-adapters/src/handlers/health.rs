use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::ApiResult;
use crate::handlers::ok;
use crate::state::AppState;

/// Store ping; 503 through the error envelope when the store is down.
pub async fn health(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.health.ping().await?;
    Ok(ok(serde_json::json!({ "status": "ok" })))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
