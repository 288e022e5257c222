//! Append-only audit trail. Nothing in this module updates or deletes rows.

use async_trait::async_trait;
use chrono::Utc;
use domains::{AppError, AuditEntry, AuditRepo, NewAuditEntry, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::db_err;

const ENTRY_SELECT: &str = "SELECT a.id, a.actor_id, u.username AS actor_username, a.action, a.detail, a.created_at
     FROM audit_logs a LEFT JOIN users u ON u.id = a.actor_id";

pub struct SqliteAuditRepo {
    pool: SqlitePool,
}

impl SqliteAuditRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.try_get("id").map_err(db_err)?,
        actor_id: row.try_get("actor_id").map_err(db_err)?,
        actor_username: row.try_get("actor_username").map_err(db_err)?,
        action: row.try_get("action").map_err(db_err)?,
        detail: row.try_get("detail").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

#[async_trait]
impl AuditRepo for SqliteAuditRepo {
    async fn append(&self, entry: &NewAuditEntry) -> Result<AuditEntry> {
        let id = sqlx::query(
            "INSERT INTO audit_logs (actor_id, action, detail, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(entry.actor_id)
        .bind(entry.action.label())
        .bind(&entry.detail)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .last_insert_rowid();

        let sql = format!("{ENTRY_SELECT} WHERE a.id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::not_found("audit entry", id))?;
        entry_from_row(&row)
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<AuditEntry>> {
        let sql = format!("{ENTRY_SELECT} ORDER BY a.id DESC LIMIT ? OFFSET ?");
        sqlx::query(&sql)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(entry_from_row)
            .collect()
    }
}
