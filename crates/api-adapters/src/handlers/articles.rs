//! Article reads and lifecycle transitions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use domains::{ArticleChanges, ArticleId, ListScope, NewArticle, TransitionReport};
use serde::{Deserialize, Serialize};
use serde_json::json;
use services::ArticleQuery;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Authenticated, MaybeAuthenticated};
use crate::handlers::ok;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub status: ListScope,
    pub category: Option<i64>,
    #[serde(default)]
    pub urgent: bool,
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub permanent: bool,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub ids: Vec<ArticleId>,
}

#[derive(Debug, Serialize)]
pub struct ReportBody {
    pub affected: usize,
    pub changed: Vec<ArticleId>,
    pub unchanged: Vec<ArticleId>,
}

impl From<TransitionReport> for ReportBody {
    fn from(report: TransitionReport) -> Self {
        Self {
            affected: report.affected(),
            changed: report.changed,
            unchanged: report.unchanged,
        }
    }
}

pub async fn list_articles(
    State(state): State<AppState>,
    MaybeAuthenticated(viewer): MaybeAuthenticated,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let query = ArticleQuery {
        scope: params.status,
        category_id: params.category,
        urgent_only: params.urgent,
        query: params.q,
        limit: params.limit,
        offset: params.offset,
    };
    Ok(ok(state.articles.list(viewer.as_ref(), query).await?))
}

pub async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .articles
        .search(&params.q, params.limit, params.offset)
        .await?))
}

/// Anonymous reads bump the view counter.
pub async fn get_article(
    State(state): State<AppState>,
    MaybeAuthenticated(viewer): MaybeAuthenticated,
    ApiPath(id): ApiPath<ArticleId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.articles.get(viewer.as_ref(), id).await?))
}

pub async fn create_article(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiJson(article): ApiJson<NewArticle>,
) -> ApiResult<impl IntoResponse> {
    let article = state.articles.create(&identity, article).await?;
    Ok((StatusCode::CREATED, ok(article)))
}

pub async fn update_article(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiPath(id): ApiPath<ArticleId>,
    ApiJson(changes): ApiJson<ArticleChanges>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.articles.update(&identity, id, changes).await?))
}

pub async fn toggle_visibility(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiPath(id): ApiPath<ArticleId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.articles.toggle_visibility(&identity, id).await?))
}

/// Trash by default; `?permanent=true` removes the row without passing the trash.
pub async fn delete_article(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiPath(id): ApiPath<ArticleId>,
    ApiQuery(params): ApiQuery<DeleteParams>,
) -> ApiResult<impl IntoResponse> {
    let report = if params.permanent {
        state.articles.delete_permanently(&identity, id).await?
    } else {
        state.articles.trash(&identity, id).await?
    };
    Ok(ok(ReportBody::from(report)))
}

pub async fn restore_article(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiPath(id): ApiPath<ArticleId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(ReportBody::from(state.articles.restore(&identity, id).await?)))
}

pub async fn purge_article(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiPath(id): ApiPath<ArticleId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(ReportBody::from(state.articles.purge(&identity, id).await?)))
}

pub async fn bulk_trash(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiJson(req): ApiJson<BulkRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(ReportBody::from(
        state.articles.bulk_trash(&identity, &req.ids).await?,
    )))
}

pub async fn bulk_restore(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiJson(req): ApiJson<BulkRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(ReportBody::from(
        state.articles.bulk_restore(&identity, &req.ids).await?,
    )))
}

/// Bulk purge; only trashed articles are accepted.
pub async fn bulk_delete(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ApiJson(req): ApiJson<BulkRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(ReportBody::from(
        state.articles.bulk_purge(&identity, &req.ids).await?,
    )))
}

pub async fn empty_trash(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let purged = state.articles.empty_trash(&identity).await?;
    Ok(ok(json!({ "affected": purged })))
}
