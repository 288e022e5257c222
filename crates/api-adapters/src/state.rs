//! Shared request state. Every field is a cheap clone over `Arc`s; nothing
//! here holds writable data between requests.

use std::net::IpAddr;
use std::sync::Arc;

use domains::HealthCheck;
use services::{
    AccountService, ArticleService, AuditRecorder, Blocklist, PasswordResetFlow, SettingsLedger,
};

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub articles: ArticleService,
    pub audit: AuditRecorder,
    pub settings: SettingsLedger,
    pub blocklist: Blocklist,
    pub resets: PasswordResetFlow,
    pub health: Arc<dyn HealthCheck>,
    pub metrics: Arc<Metrics>,
    /// Peers whose `X-Forwarded-For` header is believed.
    pub trusted_proxies: Arc<[IpAddr]>,
}
