//! # Audit Recorder
//!
//! Appends one entry per logical mutating action, after the mutation has
//! committed. Append failures are logged and swallowed: the business action
//! already happened and its response must not turn into a failure.

use std::sync::Arc;

use domains::{
    authorize, AuditAction, AuditEntry, AuditRepo, Identity, NewAuditEntry, Requirement, Result,
    UserId,
};
use tracing::{debug, warn};

use crate::utils::page;

pub const DEFAULT_AUDIT_PAGE: u32 = 50;
pub const MAX_AUDIT_PAGE: u32 = 200;

#[derive(Clone)]
pub struct AuditRecorder {
    repo: Arc<dyn AuditRepo>,
}

impl AuditRecorder {
    pub fn new(repo: Arc<dyn AuditRepo>) -> Self {
        Self { repo }
    }

    /// Best-effort append. `actor = None` marks a system action.
    pub async fn record(&self, actor: Option<UserId>, action: AuditAction, detail: impl Into<String>) {
        let entry = NewAuditEntry {
            actor_id: actor,
            action,
            detail: detail.into(),
        };
        match self.repo.append(&entry).await {
            Ok(saved) => debug!(id = saved.id, action = %action, "audit entry recorded"),
            Err(err) => warn!(
                action = %action,
                actor = ?actor,
                detail = %entry.detail,
                error = %err,
                "audit write failed; mutation stays committed"
            ),
        }
    }

    /// Newest first, admin only.
    pub async fn list(
        &self,
        identity: &Identity,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<AuditEntry>> {
        authorize(identity, Requirement::Admin)?;
        let (limit, offset) = page(limit, offset, DEFAULT_AUDIT_PAGE, MAX_AUDIT_PAGE);
        self.repo.list(limit, offset).await
    }
}
