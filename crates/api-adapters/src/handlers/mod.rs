//! Route handlers, grouped by resource.

pub mod admin;
pub mod articles;
pub mod auth;
pub mod health;
pub mod settings;
pub mod users;

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Success envelope: `{"success": true, "data": ...}`.
pub fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}
