//! Article rows and the transactional application of lifecycle transitions.

use async_trait::async_trait;
use chrono::Utc;
use domains::{
    AppError, Article, ArticleChanges, ArticleFilter, ArticleId, ArticleRepo, ArticleState,
    ListScope, NewArticle, Result, Step, Transition, TransitionReport, UserId,
};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use super::db_err;

const ARTICLE_COLUMNS: &str = "id, title, body, category_id, writer_id, image_url, video_url, \
     is_urgent, views, tags, state, created_by, created_at, updated_at";

pub struct SqliteArticleRepo {
    pool: SqlitePool,
}

impl SqliteArticleRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).map_err(|e| AppError::Storage(format!("tags not encodable: {e}")))
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    let tags: String = row.try_get("tags").map_err(db_err)?;
    let state: String = row.try_get("state").map_err(db_err)?;
    Ok(Article {
        id: row.try_get("id").map_err(db_err)?,
        title: row.try_get("title").map_err(db_err)?,
        body: row.try_get("body").map_err(db_err)?,
        category_id: row.try_get("category_id").map_err(db_err)?,
        writer_id: row.try_get("writer_id").map_err(db_err)?,
        image_url: row.try_get("image_url").map_err(db_err)?,
        video_url: row.try_get("video_url").map_err(db_err)?,
        is_urgent: row.try_get("is_urgent").map_err(db_err)?,
        views: row.try_get("views").map_err(db_err)?,
        tags: serde_json::from_str(&tags)
            .map_err(|e| AppError::Storage(format!("corrupt tags column: {e}")))?,
        state: state.parse()?,
        created_by: row.try_get("created_by").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

/// `%` and `_` in user input match literally.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl ArticleRepo for SqliteArticleRepo {
    async fn insert(&self, article: &NewArticle, created_by: Option<UserId>) -> Result<Article> {
        let now = Utc::now();
        let state = if article.active {
            ArticleState::Active
        } else {
            ArticleState::Hidden
        };
        let id = sqlx::query(
            "INSERT INTO articles (title, body, category_id, writer_id, image_url, video_url,
                                   is_urgent, tags, state, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&article.title)
        .bind(&article.body)
        .bind(article.category_id)
        .bind(article.writer_id)
        .bind(article.image_url.as_deref())
        .bind(article.video_url.as_deref())
        .bind(article.is_urgent)
        .bind(encode_tags(&article.tags)?)
        .bind(state.as_str())
        .bind(created_by)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .last_insert_rowid();

        self.find(id)
            .await?
            .ok_or_else(|| AppError::not_found("article", id))
    }

    async fn find(&self, id: ArticleId) -> Result<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| article_from_row(&row))
            .transpose()
    }

    async fn list(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE "));
        match filter.scope {
            ListScope::Published => qb.push("state = 'active'"),
            ListScope::Hidden => qb.push("state = 'hidden'"),
            ListScope::Trashed => qb.push("state = 'trashed'"),
            ListScope::Live => qb.push("state <> 'trashed'"),
        };
        if let Some(category_id) = filter.category_id {
            qb.push(" AND category_id = ").push_bind(category_id);
        }
        if filter.urgent_only {
            qb.push(" AND is_urgent = 1");
        }
        if let Some(query) = &filter.query {
            let pattern = like_pattern(query);
            qb.push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR body LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        qb.push(" ORDER BY id DESC LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        qb.build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(article_from_row)
            .collect()
    }

    async fn update(&self, id: ArticleId, changes: &ArticleChanges) -> Result<Option<Article>> {
        let tags = changes.tags.as_deref().map(encode_tags).transpose()?;
        let affected = sqlx::query(
            "UPDATE articles SET
                title       = COALESCE(?, title),
                body        = COALESCE(?, body),
                category_id = CASE WHEN ? THEN ? ELSE category_id END,
                writer_id   = CASE WHEN ? THEN ? ELSE writer_id END,
                image_url   = CASE WHEN ? THEN ? ELSE image_url END,
                video_url   = CASE WHEN ? THEN ? ELSE video_url END,
                is_urgent   = COALESCE(?, is_urgent),
                tags        = COALESCE(?, tags),
                updated_at  = ?
             WHERE id = ? AND state <> 'trashed'",
        )
        .bind(changes.title.as_deref())
        .bind(changes.body.as_deref())
        .bind(changes.category_id.is_some())
        .bind(changes.category_id.flatten())
        .bind(changes.writer_id.is_some())
        .bind(changes.writer_id.flatten())
        .bind(changes.image_url.is_some())
        .bind(changes.image_url.clone().flatten())
        .bind(changes.video_url.is_some())
        .bind(changes.video_url.clone().flatten())
        .bind(changes.is_urgent)
        .bind(tags)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .rows_affected();

        if affected == 0 {
            return Ok(None);
        }
        self.find(id).await
    }

    async fn transition(
        &self,
        ids: &[ArticleId],
        transition: Transition,
    ) -> Result<TransitionReport> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Plan every row before writing any, so a bad id leaves the batch untouched.
        let mut plan = Vec::with_capacity(ids.len());
        for &id in ids {
            let state: Option<String> = sqlx::query_scalar("SELECT state FROM articles WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
            let state: ArticleState = state
                .ok_or_else(|| AppError::not_found("article", id))?
                .parse()?;
            plan.push((id, transition.plan(id, state)?));
        }

        let now = Utc::now();
        let mut report = TransitionReport::default();
        for (id, step) in plan {
            match step {
                Step::Set(next) => {
                    sqlx::query("UPDATE articles SET state = ?, updated_at = ? WHERE id = ?")
                        .bind(next.as_str())
                        .bind(now)
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_err)?;
                    report.changed.push(id);
                }
                Step::Remove => {
                    sqlx::query("DELETE FROM articles WHERE id = ?")
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_err)?;
                    report.changed.push(id);
                }
                Step::Keep => report.unchanged.push(id),
            }
        }

        tx.commit().await.map_err(db_err)?;
        debug!(?transition, changed = report.changed.len(), "article transition applied");
        Ok(report)
    }

    async fn empty_trash(&self) -> Result<Vec<ArticleId>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let ids: Vec<ArticleId> =
            sqlx::query_scalar("SELECT id FROM articles WHERE state = 'trashed' ORDER BY id")
                .fetch_all(&mut *tx)
                .await
                .map_err(db_err)?;
        sqlx::query("DELETE FROM articles WHERE state = 'trashed'")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(ids)
    }

    async fn record_view(&self, id: ArticleId) -> Result<bool> {
        let affected = sqlx::query(
            "UPDATE articles SET views = views + 1 WHERE id = ? AND state = 'active'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .rows_affected();
        Ok(affected > 0)
    }
}
