use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Uri};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;
use domains::AppError;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{admin, articles, auth, health, settings, users};
use crate::middleware::{block_filter, make_span, track_metrics, UuidRequestId, REQUEST_ID_HEADER};
use crate::state::AppState;

async fn unknown_route(uri: Uri) -> ApiError {
    ApiError(AppError::not_found("route", uri.path()))
}

/// Builds the full application router.
///
/// Layers, outermost first: request id, trace span, CORS, metrics, blocklist.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        // auth
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        // users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", get(users::get_user).put(users::update_user))
        // articles
        .route(
            "/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        .route(
            "/articles/{id}",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .route("/articles/{id}/visibility", post(articles::toggle_visibility))
        .route("/articles/{id}/restore", post(articles::restore_article))
        .route("/articles/bulk/trash", post(articles::bulk_trash))
        .route("/articles/bulk/restore", post(articles::bulk_restore))
        .route("/articles/bulk/delete", post(articles::bulk_delete))
        .route("/articles/trash/empty", delete(articles::empty_trash))
        .route("/articles/trash/{id}", delete(articles::purge_article))
        .route("/search", get(articles::search))
        // settings
        .route(
            "/settings",
            get(settings::get_settings).post(settings::update_settings),
        )
        // admin
        .route("/admin/audit-logs", get(admin::audit_logs))
        .route(
            "/admin/blocked-ips",
            get(admin::list_blocked).post(admin::block_ip),
        )
        .route("/admin/blocked-ips/{id}", delete(admin::unblock_ip))
        .fallback(unknown_route)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), UuidRequestId))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(from_fn_with_state(state.clone(), track_metrics))
                .layer(from_fn_with_state(state.clone(), block_filter)),
        )
        .with_state(state)
}
