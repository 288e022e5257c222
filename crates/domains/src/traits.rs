//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be wired into the binary.
//! Every repository reaches the same relational store; none of them caches
//! writable state between requests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::lifecycle::{Transition, TransitionReport};
use crate::models::{
    Article, ArticleChanges, ArticleFilter, ArticleId, AuditEntry, BlockedIp, NewArticle,
    NewAuditEntry, NewUserRecord, SessionClaims, User, UserChanges, UserId,
};

/// Credential store contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `Conflict` on a duplicate username or email.
    async fn create(&self, user: &NewUserRecord) -> Result<User>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;
    /// Returns the user together with its stored password hash.
    async fn find_credentials(&self, username: &str) -> Result<Option<(User, String)>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list(&self) -> Result<Vec<User>>;
    /// `Ok(None)` when no row has this id.
    async fn update(&self, id: UserId, changes: &UserChanges) -> Result<Option<User>>;
    async fn count(&self) -> Result<i64>;

    /// Overwrites any pending reset token of the user.
    async fn store_reset_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Atomically swaps the password and clears the token when `token_hash`
    /// matches an unexpired row. An expired match is cleared and reported as `None`.
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>>;
}

/// Article persistence contract. Lifecycle rules live in [`Transition::plan`];
/// implementations apply them inside one transaction per call.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ArticleRepo: Send + Sync {
    async fn insert(&self, article: &NewArticle, created_by: Option<UserId>) -> Result<Article>;
    async fn find(&self, id: ArticleId) -> Result<Option<Article>>;
    async fn list(&self, filter: &ArticleFilter) -> Result<Vec<Article>>;

    /// Updates a non-trashed row; `Ok(None)` when no such row exists.
    async fn update(&self, id: ArticleId, changes: &ArticleChanges) -> Result<Option<Article>>;

    /// All-or-nothing: an unknown id yields `NotFound` and a forbidden
    /// transition yields `Conflict`, leaving every row untouched.
    async fn transition(&self, ids: &[ArticleId], transition: Transition)
        -> Result<TransitionReport>;

    /// Removes every trashed row and returns the ids removed.
    async fn empty_trash(&self) -> Result<Vec<ArticleId>>;

    /// Best-effort counter bump on an active row; `false` when nothing matched.
    async fn record_view(&self, id: ArticleId) -> Result<bool>;
}

/// Append-only audit trail.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuditRepo: Send + Sync {
    async fn append(&self, entry: &NewAuditEntry) -> Result<AuditEntry>;
    /// Newest first.
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<AuditEntry>>;
}

/// Flat key/value configuration ledger.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn all(&self) -> Result<BTreeMap<String, String>>;
    /// Insert-or-update every pair in one transaction.
    async fn upsert_many(&self, values: &BTreeMap<String, String>) -> Result<()>;
}

/// IP deny list. Duplicate addresses are tolerated.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlocklistRepo: Send + Sync {
    async fn insert(&self, address: &str, reason: Option<String>) -> Result<BlockedIp>;
    async fn find(&self, id: i64) -> Result<Option<BlockedIp>>;
    /// `false` when no row had this id.
    async fn delete(&self, id: i64) -> Result<bool>;
    async fn list(&self) -> Result<Vec<BlockedIp>>;
    /// `true` if any row matches.
    async fn contains(&self, address: &str) -> Result<bool>;
}

/// One-way secret hashing.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String>;
    /// Never errors: an unparsable hash simply does not verify.
    fn verify(&self, secret: &str, hash: &str) -> bool;
}

/// Session token codec. `decode` must be the exact inverse of `issue`
/// and fail closed with `Authentication` on any other input.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenCodec: Send + Sync {
    fn issue(&self, claims: &SessionClaims) -> Result<String>;
    fn decode(&self, token: &str) -> Result<SessionClaims>;
}

/// Delivers the raw reset token to the account owner.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset(&self, user: &User, token: &str, expires_at: DateTime<Utc>) -> Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Liveness of the backing store, used by the health endpoint.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<()>;
}
