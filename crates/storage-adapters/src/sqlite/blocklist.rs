//! IP deny list rows.

use async_trait::async_trait;
use chrono::Utc;
use domains::{AppError, BlockedIp, BlocklistRepo, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::db_err;

pub struct SqliteBlocklistRepo {
    pool: SqlitePool,
}

impl SqliteBlocklistRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<BlockedIp> {
    Ok(BlockedIp {
        id: row.try_get("id").map_err(db_err)?,
        address: row.try_get("address").map_err(db_err)?,
        reason: row.try_get("reason").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

#[async_trait]
impl BlocklistRepo for SqliteBlocklistRepo {
    async fn insert(&self, address: &str, reason: Option<String>) -> Result<BlockedIp> {
        let id = sqlx::query("INSERT INTO blocked_ips (address, reason, created_at) VALUES (?, ?, ?)")
            .bind(address)
            .bind(reason)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .last_insert_rowid();
        self.find(id)
            .await?
            .ok_or_else(|| AppError::not_found("blocked ip", id))
    }

    async fn find(&self, id: i64) -> Result<Option<BlockedIp>> {
        sqlx::query("SELECT id, address, reason, created_at FROM blocked_ips WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| entry_from_row(&row))
            .transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM blocked_ips WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list(&self) -> Result<Vec<BlockedIp>> {
        sqlx::query("SELECT id, address, reason, created_at FROM blocked_ips ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(entry_from_row)
            .collect()
    }

    async fn contains(&self, address: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM blocked_ips WHERE address = ?)")
            .bind(address)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
