use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::IntoResponse;

use crate::error::ApiResult;
use crate::extract::{ApiJson, Authenticated};
use crate::handlers::ok;
use crate::state::AppState;

/// Public flat mapping of every setting.
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.settings.get_all().await?))
}

/// Body is a flat `{"key": "value"}` object, written all-or-nothing.
pub async fn update_settings(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiJson(values): ApiJson<BTreeMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.settings.set_many(&identity, values).await?))
}
