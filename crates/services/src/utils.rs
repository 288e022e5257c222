//! Small helpers shared by the use-case services.

use domains::{AppError, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Minimum accepted length for a new password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// 64 hex characters drawn from two random v4 UUIDs.
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// SHA-256 hex digest. Reset tokens are persisted only in this form.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Trimmed, non-empty required text field.
pub fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Clamp caller-supplied paging into `1..=max`, falling back to `default`.
pub fn page(limit: Option<u32>, offset: Option<u32>, default: u32, max: u32) -> (u32, u32) {
    let limit = limit.unwrap_or(default).clamp(1, max);
    (limit, offset.unwrap_or(0))
}
