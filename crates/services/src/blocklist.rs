//! # Security Blocklist
//!
//! CRUD over denied client addresses plus the lookup the request filter uses.

use std::net::IpAddr;
use std::sync::Arc;

use domains::{
    authorize, AppError, AuditAction, BlockedIp, BlocklistRepo, Identity, Requirement, Result,
};

use crate::audit::AuditRecorder;

#[derive(Clone)]
pub struct Blocklist {
    repo: Arc<dyn BlocklistRepo>,
    audit: AuditRecorder,
}

impl Blocklist {
    pub fn new(repo: Arc<dyn BlocklistRepo>, audit: AuditRecorder) -> Self {
        Self { repo, audit }
    }

    pub async fn block(
        &self,
        identity: &Identity,
        address: &str,
        reason: Option<String>,
    ) -> Result<BlockedIp> {
        authorize(identity, Requirement::Admin)?;
        let address = canonical(address)
            .ok_or_else(|| AppError::Validation(format!("'{}' is not an IP address", address.trim())))?;
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

        let entry = self.repo.insert(&address, reason).await?;
        let detail = match &entry.reason {
            Some(reason) => format!("blocked {} ({reason})", entry.address),
            None => format!("blocked {}", entry.address),
        };
        self.audit
            .record(Some(identity.user_id), AuditAction::IpBlock, detail)
            .await;
        Ok(entry)
    }

    pub async fn unblock(&self, identity: &Identity, id: i64) -> Result<()> {
        authorize(identity, Requirement::Admin)?;
        let entry = self
            .repo
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("blocked ip", id))?;
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found("blocked ip", id));
        }
        self.audit
            .record(
                Some(identity.user_id),
                AuditAction::IpUnblock,
                format!("unblocked {} (entry {id})", entry.address),
            )
            .await;
        Ok(())
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<BlockedIp>> {
        authorize(identity, Requirement::Admin)?;
        self.repo.list().await
    }

    /// Unauthenticated lookup used ahead of all request handling.
    pub async fn is_blocked(&self, address: &str) -> Result<bool> {
        let address = canonical(address).unwrap_or_else(|| address.trim().to_string());
        self.repo.contains(&address).await
    }
}

/// Canonical textual form, so `2001:DB8:0::1` and `2001:db8::1` compare equal.
fn canonical(address: &str) -> Option<String> {
    address.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string())
}
