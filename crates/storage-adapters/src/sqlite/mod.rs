//! # SQLite Store
//!
//! One pool shared by every repository. Multi-row writes open a transaction
//! on that pool and commit only after every statement succeeded; dropping an
//! uncommitted `Transaction` rolls it back.

mod articles;
mod audit;
mod blocklist;
mod settings;
mod users;

use std::str::FromStr;

use async_trait::async_trait;
use domains::{AppError, HealthCheck, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{error, info};

pub use articles::SqliteArticleRepo;
pub use audit::SqliteAuditRepo;
pub use blocklist::SqliteBlocklistRepo;
pub use settings::SqliteSettingsRepo;
pub use users::SqliteUserRepo;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(db_err)?;
        info!(url, max_connections, "connected to sqlite");
        Ok(Self { pool })
    }

    /// Private in-memory database. Every connection to `:memory:` is a fresh
    /// database, so the pool is pinned to one connection that never expires.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_err)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Storage(format!("migration failed: {e}")))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn users(&self) -> SqliteUserRepo {
        SqliteUserRepo::new(self.pool.clone())
    }

    pub fn articles(&self) -> SqliteArticleRepo {
        SqliteArticleRepo::new(self.pool.clone())
    }

    pub fn audit(&self) -> SqliteAuditRepo {
        SqliteAuditRepo::new(self.pool.clone())
    }

    pub fn settings(&self) -> SqliteSettingsRepo {
        SqliteSettingsRepo::new(self.pool.clone())
    }

    pub fn blocklist(&self) -> SqliteBlocklistRepo {
        SqliteBlocklistRepo::new(self.pool.clone())
    }
}

#[async_trait]
impl HealthCheck for SqliteStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(db_err)
    }
}

/// Unique violations become `Conflict`; everything else is a retryable `Storage` error.
pub(crate) fn db_err(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("duplicate value: {}", db.message()))
        }
        _ => {
            error!(error = %err, "database error");
            AppError::Storage(err.to_string())
        }
    }
}

#[cfg(test)]
pub(crate) async fn test_store() -> SqliteStore {
    let store = SqliteStore::connect_in_memory().await.unwrap();
    store.migrate().await.unwrap();
    store
}
