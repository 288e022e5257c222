//! # AppError
//!
//! Centralized error handling for the newsroom backend.
//! Every port and service returns this taxonomy so the API layer can map
//! each failure to a machine-distinguishable error kind.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Missing, malformed or expired session token, or bad login credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Authenticated, but the identity lacks the required capability.
    #[error("forbidden: {0}")]
    Authorization(String),

    /// Malformed or empty required input (e.g. empty bulk id list)
    #[error("validation error: {0}")]
    Validation(String),

    /// Uniqueness violation or a lifecycle transition the current state forbids
    #[error("conflict: {0}")]
    Conflict(String),

    /// Resource not found (e.g. Article, User, BlockedIp)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Store unavailable or transaction aborted; always retryable.
    #[error("storage error: {0}")]
    Storage(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound(entity.to_string(), id.to_string())
    }

    /// Stable machine-readable label used in API error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication",
            Self::Authorization(_) => "authorization",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::NotFound(..) => "not_found",
            Self::Storage(_) => "storage",
        }
    }
}

/// A specialized Result type for newsroom logic.
pub type Result<T> = std::result::Result<T, AppError>;
