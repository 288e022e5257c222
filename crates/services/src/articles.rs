//! # Article Lifecycle Manager
//!
//! Entry points for every article mutation. Each call authorizes first,
//! validates second, lets the repository apply the change inside its own
//! transaction, and only then appends a single audit entry.

use std::sync::Arc;

use domains::{
    authorize, normalize_ids, satisfies, AppError, Article, ArticleChanges, ArticleFilter,
    ArticleId, ArticleRepo, ArticleState, AuditAction, Capability, Identity, ListScope,
    NewArticle, Requirement, Result, Transition, TransitionReport,
};
use tracing::warn;

use crate::audit::AuditRecorder;
use crate::utils::{page, required};

pub const DEFAULT_ARTICLE_PAGE: u32 = 20;
pub const MAX_ARTICLE_PAGE: u32 = 100;

const NEWS: Requirement = Requirement::Capability(Capability::News);
const TRASH_VIEWERS: Requirement = Requirement::AnyOf(&[Capability::News, Capability::Trash]);

/// Caller-facing listing parameters before paging is clamped.
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub scope: ListScope,
    pub category_id: Option<i64>,
    pub urgent_only: bool,
    pub query: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Clone)]
pub struct ArticleService {
    articles: Arc<dyn ArticleRepo>,
    audit: AuditRecorder,
}

impl ArticleService {
    pub fn new(articles: Arc<dyn ArticleRepo>, audit: AuditRecorder) -> Self {
        Self { articles, audit }
    }

    pub async fn create(&self, identity: &Identity, mut article: NewArticle) -> Result<Article> {
        authorize(identity, NEWS)?;
        article.title = required("title", &article.title)?;
        article.body = required("body", &article.body)?;
        article.tags = clean_tags(article.tags);

        let saved = self.articles.insert(&article, Some(identity.user_id)).await?;
        self.audit
            .record(
                Some(identity.user_id),
                AuditAction::ArticleCreate,
                format!("created {} article {} '{}'", saved.state.as_str(), saved.id, saved.title),
            )
            .await;
        Ok(saved)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: ArticleId,
        mut changes: ArticleChanges,
    ) -> Result<Article> {
        authorize(identity, NEWS)?;
        if changes.is_empty() {
            return Err(AppError::Validation("no updates provided".into()));
        }
        if let Some(title) = changes.title.as_deref() {
            changes.title = Some(required("title", title)?);
        }
        if let Some(body) = changes.body.as_deref() {
            changes.body = Some(required("body", body)?);
        }
        changes.tags = changes.tags.map(clean_tags);

        let current = self
            .articles
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("article", id))?;
        if current.state == ArticleState::Trashed {
            return Err(AppError::Conflict(format!(
                "article {id} is in the trash; restore it before editing"
            )));
        }

        // A concurrent trash between the read and the write surfaces as not found.
        let saved = self
            .articles
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::not_found("article", id))?;
        self.audit
            .record(
                Some(identity.user_id),
                AuditAction::ArticleUpdate,
                format!("updated article {id} '{}'", saved.title),
            )
            .await;
        Ok(saved)
    }

    /// `Active ⇄ Hidden`. Trashed articles are rejected with `Conflict`.
    pub async fn toggle_visibility(&self, identity: &Identity, id: ArticleId) -> Result<Article> {
        self.apply_one(identity, id, Transition::ToggleVisibility, AuditAction::ArticleToggleVisibility)
            .await?;
        self.articles
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("article", id))
    }

    pub async fn trash(&self, identity: &Identity, id: ArticleId) -> Result<TransitionReport> {
        self.apply_one(identity, id, Transition::Trash, AuditAction::ArticleTrash)
            .await
    }

    pub async fn restore(&self, identity: &Identity, id: ArticleId) -> Result<TransitionReport> {
        self.apply_one(identity, id, Transition::Restore, AuditAction::ArticleRestore)
            .await
    }

    /// Removes a trashed article for good.
    pub async fn purge(&self, identity: &Identity, id: ArticleId) -> Result<TransitionReport> {
        self.apply_one(identity, id, Transition::Purge, AuditAction::ArticlePurge)
            .await
    }

    /// Direct permanent delete that skips the trash.
    pub async fn delete_permanently(
        &self,
        identity: &Identity,
        id: ArticleId,
    ) -> Result<TransitionReport> {
        self.apply_one(identity, id, Transition::Delete, AuditAction::ArticleDelete)
            .await
    }

    pub async fn bulk_trash(&self, identity: &Identity, ids: &[ArticleId]) -> Result<TransitionReport> {
        self.apply_bulk(identity, ids, Transition::Trash, AuditAction::ArticleBulkTrash)
            .await
    }

    pub async fn bulk_restore(
        &self,
        identity: &Identity,
        ids: &[ArticleId],
    ) -> Result<TransitionReport> {
        self.apply_bulk(identity, ids, Transition::Restore, AuditAction::ArticleBulkRestore)
            .await
    }

    pub async fn bulk_purge(&self, identity: &Identity, ids: &[ArticleId]) -> Result<TransitionReport> {
        self.apply_bulk(identity, ids, Transition::Purge, AuditAction::ArticleBulkPurge)
            .await
    }

    /// Purges every trashed article. Returns the number removed.
    pub async fn empty_trash(&self, identity: &Identity) -> Result<usize> {
        authorize(identity, Transition::Purge.requirement())?;
        let removed = self.articles.empty_trash().await?;
        self.audit
            .record(
                Some(identity.user_id),
                AuditAction::TrashEmpty,
                format!("emptied trash, purged {} articles {:?}", removed.len(), removed),
            )
            .await;
        Ok(removed.len())
    }

    /// Listing with per-scope gating. Anonymous callers only see published articles.
    pub async fn list(&self, viewer: Option<&Identity>, query: ArticleQuery) -> Result<Vec<Article>> {
        let requirement = match query.scope {
            ListScope::Published => None,
            ListScope::Hidden | ListScope::Live => Some(NEWS),
            ListScope::Trashed => Some(TRASH_VIEWERS),
        };
        if let Some(requirement) = requirement {
            let identity = viewer.ok_or_else(|| {
                AppError::Authentication("sign in to list unpublished articles".into())
            })?;
            authorize(identity, requirement)?;
        }

        let (limit, offset) = page(query.limit, query.offset, DEFAULT_ARTICLE_PAGE, MAX_ARTICLE_PAGE);
        let filter = ArticleFilter {
            scope: query.scope,
            category_id: query.category_id,
            urgent_only: query.urgent_only,
            query: query
                .query
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            limit,
            offset,
        };
        self.articles.list(&filter).await
    }

    /// Public search over published articles.
    pub async fn search(&self, text: &str, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<Article>> {
        let text = required("q", text)?;
        self.list(
            None,
            ArticleQuery {
                query: Some(text),
                limit,
                offset,
                ..ArticleQuery::default()
            },
        )
        .await
    }

    /// Single-article read.
    ///
    /// Staff see what their listings show them and leave the counter alone:
    /// `news` reaches every state, `trash` alone reaches active and trashed rows.
    /// Everyone else sees active articles only and bumps the view counter.
    pub async fn get(&self, viewer: Option<&Identity>, id: ArticleId) -> Result<Article> {
        let mut article = self
            .articles
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("article", id))?;

        if let Some(identity) = viewer.filter(|identity| satisfies(identity, TRASH_VIEWERS)) {
            if article.state == ArticleState::Hidden && !satisfies(identity, NEWS) {
                return Err(AppError::not_found("article", id));
            }
            return Ok(article);
        }
        if article.state != ArticleState::Active {
            return Err(AppError::not_found("article", id));
        }

        match self.articles.record_view(id).await {
            Ok(true) => article.views += 1,
            Ok(false) => {}
            Err(err) => warn!(article = id, error = %err, "view counter not incremented"),
        }
        Ok(article)
    }

    async fn apply_one(
        &self,
        identity: &Identity,
        id: ArticleId,
        transition: Transition,
        action: AuditAction,
    ) -> Result<TransitionReport> {
        authorize(identity, transition.requirement())?;
        if id <= 0 {
            return Err(AppError::not_found("article", id));
        }
        let report = self.articles.transition(&[id], transition).await?;
        let detail = if report.changed.is_empty() {
            format!("article {id}: {} was a no-op", transition.verb())
        } else {
            format!("{} article {id}", past_tense(transition))
        };
        self.audit.record(Some(identity.user_id), action, detail).await;
        Ok(report)
    }

    async fn apply_bulk(
        &self,
        identity: &Identity,
        ids: &[ArticleId],
        transition: Transition,
        action: AuditAction,
    ) -> Result<TransitionReport> {
        authorize(identity, transition.requirement())?;
        let ids = normalize_ids(ids)?;
        let report = self.articles.transition(&ids, transition).await?;
        self.audit
            .record(
                Some(identity.user_id),
                action,
                format!(
                    "{} {} of {} articles {:?}",
                    past_tense(transition),
                    report.affected(),
                    ids.len(),
                    ids
                ),
            )
            .await;
        Ok(report)
    }
}

fn past_tense(transition: Transition) -> &'static str {
    match transition {
        Transition::ToggleVisibility => "toggled visibility of",
        Transition::Trash => "trashed",
        Transition::Restore => "restored",
        Transition::Purge => "purged",
        Transition::Delete => "permanently deleted",
    }
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
