//! # storage-adapters
//!
//! Relational implementations of the repository ports in `domains`.

#[cfg(feature = "db-sqlite")]
pub mod sqlite;

#[cfg(feature = "db-sqlite")]
pub use sqlite::{
    SqliteArticleRepo, SqliteAuditRepo, SqliteBlocklistRepo, SqliteSettingsRepo, SqliteStore,
    SqliteUserRepo,
};
