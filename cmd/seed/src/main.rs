//! Operator tool: creates one staff account directly in the store.
//!
//! ```text
//! seed <username> <email> <password> [admin | editor[:cap,cap,...]]
//! seed desk desk@example.org s3cret-pass editor:news,trash
//! ```
//!
//! The database location comes from the same configuration as the server.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use auth_adapters::{Argon2Hasher, JwtCodec};
use domains::{Capability, Role};
use secrecy::ExposeSecret;
use services::{AccountService, AuditRecorder, CreateUser};
use storage_adapters::SqliteStore;

fn parse_role(spec: &str) -> Result<Role> {
    let (name, caps) = spec.split_once(':').unwrap_or((spec, ""));
    let capabilities = caps
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::parse::<Capability>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Role::from_parts(name, capabilities)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().compact().init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (username, email, password, role) = match args.as_slice() {
        [u, e, p] => (u, e, p, Role::editor([Capability::News])),
        [u, e, p, r] => (u, e, p, parse_role(r)?),
        _ => bail!("usage: seed <username> <email> <password> [admin | editor[:cap,...]]"),
    };

    let config = configs::load().context("Failed to load configuration")?;
    let store = SqliteStore::connect(&config.database.url, 1)
        .await
        .context("Failed to connect to database")?;
    store.migrate().await.context("Failed to run migrations")?;

    let accounts = AccountService::new(
        Arc::new(store.users()),
        Arc::new(Argon2Hasher::new()),
        Arc::new(JwtCodec::new(
            config.auth.jwt_secret.expose_secret().as_bytes(),
            config.auth.token_ttl_minutes,
        )),
        AuditRecorder::new(Arc::new(store.audit())),
    );
    let user = accounts
        .provision(CreateUser {
            username: username.clone(),
            email: email.clone(),
            display_name: None,
            password: password.clone(),
            role,
        })
        .await
        .context("Failed to create user")?;

    println!("created {} '{}' with id {}", user.role.name(), user.username, user.id);
    Ok(())
}
