//! # Newsroom Server
//!
//! Assembles the adapters behind the service layer and serves the REST API:
//! config → tracing → store → migrations → first-run admin → router.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use api_adapters::{AppState, Metrics};
use auth_adapters::{Argon2Hasher, JwtCodec};
use configs::{AppConfig, LogConfig};
use domains::SystemClock;
use secrecy::ExposeSecret;
use services::{
    AccountService, ArticleService, AuditRecorder, Blocklist, LogResetNotifier,
    PasswordResetFlow, SettingsLedger,
};
use storage_adapters::SqliteStore;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn build_state(config: &AppConfig, store: &SqliteStore) -> AppState {
    let audit = AuditRecorder::new(Arc::new(store.audit()));
    let users = Arc::new(store.users());
    let hasher = Arc::new(Argon2Hasher::new());
    let tokens = Arc::new(JwtCodec::new(
        config.auth.jwt_secret.expose_secret().as_bytes(),
        config.auth.token_ttl_minutes,
    ));

    AppState {
        accounts: AccountService::new(users.clone(), hasher.clone(), tokens, audit.clone()),
        articles: ArticleService::new(Arc::new(store.articles()), audit.clone()),
        settings: SettingsLedger::new(Arc::new(store.settings()), audit.clone()),
        blocklist: Blocklist::new(Arc::new(store.blocklist()), audit.clone()),
        resets: PasswordResetFlow::new(
            users,
            hasher,
            Arc::new(LogResetNotifier::new(config.auth.reset_url_base.clone())),
            Arc::new(SystemClock),
            audit.clone(),
        ),
        audit,
        health: Arc::new(store.clone()),
        metrics: Arc::new(Metrics::new()),
        trusted_proxies: config.server.trusted_proxies.clone().into(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = configs::load().context("Failed to load configuration")?;
    init_tracing(&config.log);

    let store = SqliteStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    store.migrate().await.context("Failed to run migrations")?;

    let state = build_state(&config, &store);

    if let Some(password) = &config.bootstrap.admin_password {
        let seeded = state
            .accounts
            .bootstrap_admin(
                &config.bootstrap.admin_username,
                &config.bootstrap.admin_email,
                password.expose_secret(),
            )
            .await
            .context("Failed to create bootstrap administrator")?;
        if seeded.is_none() {
            info!("users already present, skipping bootstrap administrator");
        }
    }

    let app = api_adapters::router(state);
    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    Ok(())
}
