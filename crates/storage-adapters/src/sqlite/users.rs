//! Credential store backed by the `users` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    AppError, Capability, NewUserRecord, Result, Role, User, UserChanges, UserId, UserRepo,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

use super::db_err;

const USER_COLUMNS: &str = "id, username, email, display_name, role, capabilities, created_at";

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause} = ?");
        sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| user_from_row(&row))
            .transpose()
    }
}

fn encode_capabilities(role: &Role) -> Result<String> {
    serde_json::to_string(&role.granted())
        .map_err(|e| AppError::Storage(format!("capabilities not encodable: {e}")))
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.try_get("role").map_err(db_err)?;
    let capabilities: String = row.try_get("capabilities").map_err(db_err)?;
    let capabilities: Vec<Capability> = serde_json::from_str(&capabilities)
        .map_err(|e| AppError::Storage(format!("corrupt capabilities column: {e}")))?;
    Ok(User {
        id: row.try_get("id").map_err(db_err)?,
        username: row.try_get("username").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        display_name: row.try_get("display_name").map_err(db_err)?,
        role: Role::from_parts(&role, capabilities)
            .map_err(|_| AppError::Storage(format!("corrupt role column '{role}'")))?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn create(&self, user: &NewUserRecord) -> Result<User> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO users (username, email, display_name, password_hash, role, capabilities, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.role.name())
        .bind(encode_capabilities(&user.role)?)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .last_insert_rowid();

        debug!(user = id, username = %user.username, "user row inserted");
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    async fn find_credentials(&self, username: &str) -> Result<Option<(User, String)>> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?");
        let Some(row) = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        let hash: String = row.try_get("password_hash").map_err(db_err)?;
        Ok(Some((user_from_row(&row)?, hash)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_one_where("email", email).await
    }

    async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(user_from_row)
            .collect()
    }

    async fn update(&self, id: UserId, changes: &UserChanges) -> Result<Option<User>> {
        let capabilities = changes.role.as_ref().map(encode_capabilities).transpose()?;
        let affected = sqlx::query(
            "UPDATE users SET
                display_name  = COALESCE(?, display_name),
                email         = COALESCE(?, email),
                role          = COALESCE(?, role),
                capabilities  = COALESCE(?, capabilities),
                password_hash = COALESCE(?, password_hash)
             WHERE id = ?",
        )
        .bind(changes.display_name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.role.as_ref().map(Role::name))
        .bind(capabilities)
        .bind(changes.password_hash.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .rows_affected();

        if affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn store_reset_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let affected = sqlx::query(
            "UPDATE users SET reset_token_hash = ?, reset_token_expires = ? WHERE id = ?",
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .rows_affected();
        if affected == 0 {
            return Err(AppError::not_found("user", id));
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query(
            "SELECT id, reset_token_expires FROM users WHERE reset_token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let id: UserId = row.try_get("id").map_err(db_err)?;
        let expires: Option<DateTime<Utc>> = row.try_get("reset_token_expires").map_err(db_err)?;

        let redeemed = expires.is_some_and(|expires| expires > now);
        if redeemed {
            sqlx::query(
                "UPDATE users SET password_hash = ?, reset_token_hash = NULL, reset_token_expires = NULL
                 WHERE id = ?",
            )
            .bind(new_password_hash)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        } else {
            // Expired tokens are cleared so they cannot linger in the table.
            sqlx::query(
                "UPDATE users SET reset_token_hash = NULL, reset_token_expires = NULL WHERE id = ?",
            )
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(redeemed.then_some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_store;
    use chrono::TimeDelta;
    use tokio_test::assert_ok;

    fn record(username: &str, role: Role) -> NewUserRecord {
        NewUserRecord {
            username: username.into(),
            email: format!("{username}@example.org"),
            display_name: username.to_uppercase(),
            password_hash: "$argon2id$stub".into(),
            role,
        }
    }

    #[tokio::test]
    async fn create_round_trips_role_and_capabilities() {
        let repo = test_store().await.users();
        let created = repo
            .create(&record("desk", Role::editor([Capability::News, Capability::Trash])))
            .await
            .unwrap();

        let (found, hash) = repo.find_credentials("desk").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(hash, "$argon2id$stub");
        assert_eq!(found.role, Role::editor([Capability::Trash, Capability::News]));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_username_or_email_is_conflict() {
        let repo = test_store().await.users();
        assert_ok!(repo.create(&record("desk", Role::Admin)).await);

        let err = repo.create(&record("desk", Role::Admin)).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        let mut other = record("other", Role::Admin);
        other.email = "desk@example.org".into();
        assert_eq!(repo.create(&other).await.unwrap_err().kind(), "conflict");
    }

    #[tokio::test]
    async fn partial_update_leaves_other_columns() {
        let repo = test_store().await.users();
        let user = repo.create(&record("desk", Role::Admin)).await.unwrap();
        let changes = UserChanges {
            role: Some(Role::editor([Capability::Ads])),
            ..UserChanges::default()
        };
        let updated = repo.update(user.id, &changes).await.unwrap().unwrap();
        assert_eq!(updated.role, Role::editor([Capability::Ads]));
        assert_eq!(updated.email, user.email);
        assert!(repo.update(999, &changes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let repo = test_store().await.users();
        let user = repo.create(&record("desk", Role::Admin)).await.unwrap();
        let now = Utc::now();
        repo.store_reset_token(user.id, "digest", now + TimeDelta::hours(1))
            .await
            .unwrap();

        assert_eq!(
            repo.consume_reset_token("digest", "new-hash", now).await.unwrap(),
            Some(user.id)
        );
        assert_eq!(repo.consume_reset_token("digest", "again", now).await.unwrap(), None);
        let (_, hash) = repo.find_credentials("desk").await.unwrap().unwrap();
        assert_eq!(hash, "new-hash");
    }

    #[tokio::test]
    async fn expired_token_is_cleared_and_rejected() {
        let repo = test_store().await.users();
        let user = repo.create(&record("desk", Role::Admin)).await.unwrap();
        let issued = Utc::now();
        repo.store_reset_token(user.id, "digest", issued + TimeDelta::hours(1))
            .await
            .unwrap();

        let late = issued + TimeDelta::hours(1) + TimeDelta::seconds(1);
        assert_eq!(repo.consume_reset_token("digest", "x", late).await.unwrap(), None);
        // Cleared, so even an earlier clock no longer finds it.
        assert_eq!(repo.consume_reset_token("digest", "x", issued).await.unwrap(), None);
        let (_, hash) = repo.find_credentials("desk").await.unwrap().unwrap();
        assert_eq!(hash, "$argon2id$stub");
    }
}
