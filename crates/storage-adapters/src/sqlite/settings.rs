//! Key/value ledger. A batch is written in one transaction or not at all.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use domains::{Result, SettingsRepo};
use sqlx::SqlitePool;
use tracing::debug;

use super::db_err;

pub struct SqliteSettingsRepo {
    pool: SqlitePool,
}

impl SqliteSettingsRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepo for SqliteSettingsRepo {
    async fn all(&self) -> Result<BTreeMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().collect())
    }

    async fn upsert_many(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for (key, value) in values {
            sqlx::query(
                "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        debug!(keys = values.len(), "settings batch committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_store;

    fn batch(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn upsert_inserts_then_overwrites() {
        let repo = test_store().await.settings();
        repo.upsert_many(&batch(&[("site_name", "Daily"), ("theme", "light")]))
            .await
            .unwrap();
        repo.upsert_many(&batch(&[("theme", "dark")])).await.unwrap();
        assert_eq!(
            repo.all().await.unwrap(),
            batch(&[("site_name", "Daily"), ("theme", "dark")])
        );
    }

    #[tokio::test]
    async fn failure_mid_batch_leaves_ledger_untouched() {
        let store = test_store().await;
        sqlx::query(
            "CREATE TRIGGER reject_poison BEFORE INSERT ON settings WHEN NEW.key = 'poison'
             BEGIN SELECT RAISE(ABORT, 'poisoned key'); END",
        )
        .execute(store.pool())
        .await
        .unwrap();
        let repo = store.settings();
        repo.upsert_many(&batch(&[("alpha", "old")])).await.unwrap();

        // Keys apply in order, so `alpha` and `beta` are written before `poison` aborts.
        let err = repo
            .upsert_many(&batch(&[("alpha", "new"), ("beta", "2"), ("poison", "x")]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "storage");
        assert_eq!(repo.all().await.unwrap(), batch(&[("alpha", "old")]));
    }
}
