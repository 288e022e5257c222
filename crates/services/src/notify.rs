//! Reset-token delivery that writes the link to the operational log.
//! Mail transport is an external collaborator; deployments swap this out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{ResetNotifier, Result, User};
use tracing::info;

#[derive(Debug, Clone)]
pub struct LogResetNotifier {
    reset_url_base: String,
}

impl LogResetNotifier {
    /// `reset_url_base` is the front-end page that accepts `?token=`.
    pub fn new(reset_url_base: impl Into<String>) -> Self {
        Self {
            reset_url_base: reset_url_base.into(),
        }
    }

    fn link(&self, token: &str) -> String {
        format!("{}?token={token}", self.reset_url_base.trim_end_matches('?'))
    }
}

#[async_trait]
impl ResetNotifier for LogResetNotifier {
    async fn send_reset(&self, user: &User, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        info!(
            to = %user.email,
            username = %user.username,
            expires_at = %expires_at.to_rfc3339(),
            link = %self.link(token),
            "password reset mail"
        );
        Ok(())
    }
}
