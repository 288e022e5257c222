//! # Domain Models
//!
//! These structs represent the core entities of the newsroom backend.
//! Identifiers are store-assigned integers, ordered by insertion.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

pub type UserId = i64;
pub type ArticleId = i64;

/// A named permission unit grantable to an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    News,
    Categories,
    Writers,
    Comments,
    Ads,
    Trash,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::News,
        Capability::Categories,
        Capability::Writers,
        Capability::Comments,
        Capability::Ads,
        Capability::Trash,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::News => "news",
            Capability::Categories => "categories",
            Capability::Writers => "writers",
            Capability::Comments => "comments",
            Capability::Ads => "ads",
            Capability::Trash => "trash",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown capability '{s}'")))
    }
}

/// Administrators implicitly hold every capability; editors hold an explicit set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", content = "capabilities", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor(BTreeSet<Capability>),
}

impl Role {
    pub fn editor(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Role::Editor(capabilities.into_iter().collect())
    }

    /// Builds a role from its stored/wire parts. Capabilities are ignored for admins.
    pub fn from_parts(name: &str, capabilities: impl IntoIterator<Item = Capability>) -> crate::Result<Self> {
        match name {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::editor(capabilities)),
            other => Err(AppError::Validation(format!("unknown role '{other}'"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor(_) => "editor",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Explicitly granted capabilities; empty for admins.
    pub fn granted(&self) -> Vec<Capability> {
        match self {
            Role::Admin => Vec::new(),
            Role::Editor(caps) => caps.iter().copied().collect(),
        }
    }
}

/// A staff account. The secret never leaves the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(flatten)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the credential store; the secret is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update of a user row. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: UserId,
    pub username: String,
}

/// The authenticated principal of one request, reloaded from the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
        }
    }
}

/// Persisted visibility/deletion state of an article.
///
/// A purged article has no row at all, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleState {
    Active,
    Hidden,
    Trashed,
}

impl ArticleState {
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleState::Active => "active",
            ArticleState::Hidden => "hidden",
            ArticleState::Trashed => "trashed",
        }
    }
}

impl FromStr for ArticleState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ArticleState::Active),
            "hidden" => Ok(ArticleState::Hidden),
            "trashed" => Ok(ArticleState::Trashed),
            other => Err(AppError::Storage(format!("unknown article state '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub body: String,
    pub category_id: Option<i64>,
    pub writer_id: Option<i64>,
    /// URL returned by the external media store
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub is_urgent: bool,
    pub views: i64,
    pub tags: Vec<String>,
    pub state: ArticleState,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub writer_id: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// `false` creates the article hidden.
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Partial edit of an article. An absent key leaves the column alone; the
/// nullable references also accept an explicit `null`, which clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(deserialize_with = "present_or_null")]
    pub category_id: Option<Option<i64>>,
    #[serde(deserialize_with = "present_or_null")]
    pub writer_id: Option<Option<i64>>,
    #[serde(deserialize_with = "present_or_null")]
    pub image_url: Option<Option<String>>,
    #[serde(deserialize_with = "present_or_null")]
    pub video_url: Option<Option<String>>,
    pub is_urgent: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Only called for keys that are present, so `null` becomes `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ArticleChanges {
    pub fn is_empty(&self) -> bool {
        *self == ArticleChanges::default()
    }
}

/// Which slice of the article table a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListScope {
    /// Active articles only; the anonymous default.
    #[default]
    Published,
    Hidden,
    Trashed,
    /// Active and hidden, everything not in the trash.
    Live,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticleFilter {
    pub scope: ListScope,
    pub category_id: Option<i64>,
    pub urgent_only: bool,
    /// Case-insensitive substring matched against title or body.
    pub query: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// Typed labels for every mutating action that reaches the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    Login,
    UserBootstrap,
    UserCreate,
    UserUpdate,
    PasswordResetRequest,
    PasswordResetComplete,
    ArticleCreate,
    ArticleUpdate,
    ArticleToggleVisibility,
    ArticleTrash,
    ArticleRestore,
    ArticlePurge,
    ArticleDelete,
    ArticleBulkTrash,
    ArticleBulkRestore,
    ArticleBulkPurge,
    TrashEmpty,
    SettingsUpdate,
    IpBlock,
    IpUnblock,
}

impl AuditAction {
    pub fn label(self) -> &'static str {
        match self {
            AuditAction::Login => "auth.login",
            AuditAction::UserBootstrap => "user.bootstrap",
            AuditAction::UserCreate => "user.create",
            AuditAction::UserUpdate => "user.update",
            AuditAction::PasswordResetRequest => "auth.reset_request",
            AuditAction::PasswordResetComplete => "auth.reset_complete",
            AuditAction::ArticleCreate => "article.create",
            AuditAction::ArticleUpdate => "article.update",
            AuditAction::ArticleToggleVisibility => "article.toggle_visibility",
            AuditAction::ArticleTrash => "article.trash",
            AuditAction::ArticleRestore => "article.restore",
            AuditAction::ArticlePurge => "article.purge",
            AuditAction::ArticleDelete => "article.delete",
            AuditAction::ArticleBulkTrash => "article.bulk_trash",
            AuditAction::ArticleBulkRestore => "article.bulk_restore",
            AuditAction::ArticleBulkPurge => "article.bulk_purge",
            AuditAction::TrashEmpty => "article.empty_trash",
            AuditAction::SettingsUpdate => "settings.update",
            AuditAction::IpBlock => "security.ip_block",
            AuditAction::IpUnblock => "security.ip_unblock",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    /// `None` denotes a system action.
    pub actor_id: Option<UserId>,
    pub action: AuditAction,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub actor_id: Option<UserId>,
    /// Present while the acting user still exists.
    pub actor_username: Option<String>,
    pub action: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

/// Represents a deny-list entry against a client address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedIp {
    pub id: i64,
    pub address: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_role_serializes_with_capabilities() {
        let role = Role::editor([Capability::Trash, Capability::News]);
        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "editor", "capabilities": ["news", "trash"] }));
    }

    #[test]
    fn role_from_parts_ignores_capabilities_for_admin() {
        let role = Role::from_parts("admin", [Capability::Ads]).unwrap();
        assert_eq!(role, Role::Admin);
        assert!(role.granted().is_empty());
        assert!(Role::from_parts("owner", []).is_err());
    }

    #[test]
    fn capability_parses_from_label() {
        for cap in Capability::ALL {
            assert_eq!(cap.as_str().parse::<Capability>().unwrap(), cap);
        }
        assert!("settings".parse::<Capability>().is_err());
    }

    #[test]
    fn new_article_defaults_to_active() {
        let article: NewArticle = serde_json::from_value(serde_json::json!({
            "title": "X",
            "body": "Body"
        }))
        .unwrap();
        assert!(article.active);
        assert!(article.tags.is_empty());
        assert!(!article.is_urgent);
    }

    #[test]
    fn article_changes_tell_null_from_absent() {
        let changes: ArticleChanges = serde_json::from_value(serde_json::json!({
            "image_url": null,
            "category_id": 4
        }))
        .unwrap();
        assert_eq!(changes.image_url, Some(None));
        assert_eq!(changes.category_id, Some(Some(4)));
        assert_eq!(changes.video_url, None);
        assert_eq!(changes.writer_id, None);
        assert!(!changes.is_empty());
    }
}
