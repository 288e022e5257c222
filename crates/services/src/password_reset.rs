//! # Password Reset Flow
//!
//! Per user: `NoPendingReset → PendingReset(token, expiry) → NoPendingReset`.
//! A new request overwrites the pending token. The raw token only ever
//! reaches the [`ResetNotifier`]; the store keeps its SHA-256 digest.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use domains::{
    AppError, AuditAction, Clock, CredentialHasher, ResetNotifier, Result, UserId, UserRepo,
};
use tracing::info;

use crate::accounts::normalize_email;
use crate::audit::AuditRecorder;
use crate::utils::{check_password, generate_token, hash_token};

/// How long a reset token stays redeemable.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// What the requester learns; the token itself travels out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTicket {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PasswordResetFlow {
    users: Arc<dyn UserRepo>,
    hasher: Arc<dyn CredentialHasher>,
    notifier: Arc<dyn ResetNotifier>,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
}

impl PasswordResetFlow {
    pub fn new(
        users: Arc<dyn UserRepo>,
        hasher: Arc<dyn CredentialHasher>,
        notifier: Arc<dyn ResetNotifier>,
        clock: Arc<dyn Clock>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            users,
            hasher,
            notifier,
            clock,
            audit,
        }
    }

    /// Issues a fresh token for the account owning `email`.
    ///
    /// An unknown email is reported as `NotFound`.
    pub async fn request_reset(&self, email: &str) -> Result<ResetTicket> {
        let email = normalize_email(email)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::not_found("user with email", &email))?;

        let token = generate_token();
        let expires_at = self.clock.now() + TimeDelta::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .store_reset_token(user.id, &hash_token(&token), expires_at)
            .await?;
        self.notifier.send_reset(&user, &token, expires_at).await?;

        self.audit
            .record(
                Some(user.id),
                AuditAction::PasswordResetRequest,
                format!("reset token issued for '{}', expires {}", user.username, expires_at.to_rfc3339()),
            )
            .await;
        Ok(ResetTicket {
            user_id: user.id,
            expires_at,
        })
    }

    /// Redeems a token. Unknown, used and expired tokens are indistinguishable.
    pub async fn complete_reset(&self, token: &str, new_password: &str) -> Result<UserId> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("reset token is required".into()));
        }
        check_password(new_password)?;

        let password_hash = self.hasher.hash(new_password)?;
        let user_id = self
            .users
            .consume_reset_token(&hash_token(token), &password_hash, self.clock.now())
            .await?
            .ok_or_else(|| AppError::not_found("reset token", "(invalid or expired)"))?;

        info!(user = user_id, "password reset completed");
        self.audit
            .record(
                Some(user_id),
                AuditAction::PasswordResetComplete,
                "password changed via reset token",
            )
            .await;
        Ok(user_id)
    }
}
