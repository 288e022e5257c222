//! # Settings Ledger
//!
//! Flat key/value site configuration. Reads are public; writes are an
//! all-or-nothing batch upsert reserved for administrators.

use std::collections::BTreeMap;
use std::sync::Arc;

use domains::{authorize, AppError, AuditAction, Identity, Requirement, Result, SettingsRepo};

use crate::audit::AuditRecorder;

const MAX_KEY_LEN: usize = 128;

#[derive(Clone)]
pub struct SettingsLedger {
    repo: Arc<dyn SettingsRepo>,
    audit: AuditRecorder,
}

impl SettingsLedger {
    pub fn new(repo: Arc<dyn SettingsRepo>, audit: AuditRecorder) -> Self {
        Self { repo, audit }
    }

    pub async fn get_all(&self) -> Result<BTreeMap<String, String>> {
        self.repo.all().await
    }

    /// Writes the whole batch or nothing, then returns the full ledger.
    pub async fn set_many(
        &self,
        identity: &Identity,
        values: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        authorize(identity, Requirement::Admin)?;
        let batch = validate_batch(values)?;
        self.repo.upsert_many(&batch).await?;

        let keys: Vec<&str> = batch.keys().map(String::as_str).collect();
        self.audit
            .record(
                Some(identity.user_id),
                AuditAction::SettingsUpdate,
                format!("updated {} settings: {}", keys.len(), keys.join(", ")),
            )
            .await;
        self.repo.all().await
    }
}

fn validate_batch(values: BTreeMap<String, String>) -> Result<BTreeMap<String, String>> {
    if values.is_empty() {
        return Err(AppError::Validation("settings batch must not be empty".into()));
    }
    let mut batch = BTreeMap::new();
    for (key, value) in values {
        let key = key.trim().to_string();
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(AppError::Validation(format!(
                "setting keys must be 1..={MAX_KEY_LEN} characters"
            )));
        }
        if batch.insert(key.clone(), value).is_some() {
            return Err(AppError::Validation(format!("setting '{key}' given twice")));
        }
    }
    Ok(batch)
}
