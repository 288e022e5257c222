//! # configs
//!
//! Layered application settings. Later layers win:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/local.toml` (optional)
//! 4. environment, `NEWSROOM__SECTION__KEY` (a `.env` file is loaded first)

use std::net::IpAddr;

use config::{builder::DefaultState, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

pub const ENV_PREFIX: &str = "NEWSROOM";
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration could not be loaded: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub bootstrap: BootstrapConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Reverse proxies allowed to report the client through `X-Forwarded-For`.
    /// Empty means the socket peer is always the client.
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// e.g. `sqlite://newsroom.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing key for session tokens.
    pub jwt_secret: SecretString,
    pub token_ttl_minutes: i64,
    /// Front-end page that receives `?token=` in reset mails.
    pub reset_url_base: String,
}

/// First-run administrator. Only used while the user table is empty.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    pub admin_username: String,
    pub admin_email: String,
    #[serde(default)]
    pub admin_password: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl AppConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.auth.jwt_secret.expose_secret().len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret must be at least {MIN_JWT_SECRET_LEN} bytes"
            )));
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "auth.token_ttl_minutes must be positive".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        Ok(self)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080_i64)?
        .set_default("database.url", "sqlite://newsroom.db")?
        .set_default("database.max_connections", 5_i64)?
        .set_default("auth.token_ttl_minutes", 1440_i64)?
        .set_default("auth.reset_url_base", "http://localhost:3000/reset-password")?
        .set_default("bootstrap.admin_username", "admin")?
        .set_default("bootstrap.admin_email", "admin@newsroom.local")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ConfigError> {
    builder
        .build()?
        .try_deserialize::<AppConfig>()?
        .validate()
}

/// Loads `.env`, the optional config files and the environment.
pub fn load() -> Result<AppConfig, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env");
    }
    let builder = defaults()?
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.trusted_proxies")
                .try_parsing(true),
        );
    finish(builder)
}

/// Builds a config from an inline TOML document on top of the defaults.
pub fn from_toml(document: &str) -> Result<AppConfig, ConfigError> {
    let builder = defaults()?.add_source(File::from_str(document, config::FileFormat::Toml));
    finish(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn defaults_fill_everything_but_the_secret() {
        let cfg = from_toml(&format!("[auth]\njwt_secret = \"{SECRET}\"")).unwrap();
        assert_eq!(cfg.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.auth.token_ttl_minutes, 1440);
        assert!(cfg.bootstrap.admin_password.is_none());
        assert!(!cfg.log.json);
        assert!(cfg.server.trusted_proxies.is_empty());
    }

    #[test]
    fn trusted_proxies_are_parsed_as_addresses() {
        let cfg = from_toml(&format!(
            "[auth]\njwt_secret = \"{SECRET}\"\n[server]\ntrusted_proxies = [\"10.0.0.2\", \"::1\"]"
        ))
        .unwrap();
        assert_eq!(
            cfg.server.trusted_proxies,
            vec!["10.0.0.2".parse::<IpAddr>().unwrap(), "::1".parse::<IpAddr>().unwrap()]
        );

        let bad = format!("[auth]\njwt_secret = \"{SECRET}\"\n[server]\ntrusted_proxies = [\"proxy.local\"]");
        assert!(from_toml(&bad).is_err());
    }

    #[test]
    fn missing_secret_fails_to_load() {
        assert!(matches!(from_toml(""), Err(ConfigError::Load(_))));
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = from_toml("[auth]\njwt_secret = \"short\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn file_values_override_defaults() {
        let cfg = from_toml(&format!(
            "[auth]\njwt_secret = \"{SECRET}\"\n[server]\nport = 9000\n[bootstrap]\nadmin_password = \"changeme123\""
        ))
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(
            cfg.bootstrap.admin_password.as_ref().map(|p| p.expose_secret().to_string()),
            Some("changeme123".to_string())
        );
    }
}
