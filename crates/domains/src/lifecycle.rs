//! # Article Lifecycle
//!
//! ```text
//!   create ──► Active ◄──toggle──► Hidden
//!                 │                   │
//!                 └──── trash ────────┘
//!                         ▼
//!                      Trashed ──restore──► Active
//!                         │
//!                       purge
//!                         ▼
//!                      Purged (row removed, terminal)
//! ```
//!
//! `Delete` is the explicit permanent path for live (active or hidden) rows
//! that skips the trash. `Purge` only accepts trashed rows. Both end in row
//! removal, so nothing can come back.

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{ArticleId, ArticleState, Capability};
use crate::permission::Requirement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    ToggleVisibility,
    Trash,
    Restore,
    Purge,
    Delete,
}

/// What a transition does to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Set(ArticleState),
    Remove,
    /// Already in the target state; success without a write.
    Keep,
}

impl Transition {
    pub fn requirement(self) -> Requirement {
        match self {
            Transition::ToggleVisibility | Transition::Trash => {
                Requirement::Capability(Capability::News)
            }
            Transition::Restore | Transition::Purge | Transition::Delete => {
                Requirement::Capability(Capability::Trash)
            }
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Transition::ToggleVisibility => "toggle visibility of",
            Transition::Trash => "trash",
            Transition::Restore => "restore",
            Transition::Purge => "purge",
            Transition::Delete => "permanently delete",
        }
    }

    /// Decide the step for a row currently in `from`.
    pub fn plan(self, id: ArticleId, from: ArticleState) -> Result<Step> {
        use ArticleState::*;
        let step = match (self, from) {
            (Transition::ToggleVisibility, Active) => Step::Set(Hidden),
            (Transition::ToggleVisibility, Hidden) => Step::Set(Active),
            (Transition::Trash, Active | Hidden) => Step::Set(Trashed),
            (Transition::Trash, Trashed) => Step::Keep,
            (Transition::Restore, Trashed) => Step::Set(Active),
            (Transition::Restore, Active | Hidden) => Step::Keep,
            (Transition::Purge, Trashed) => Step::Remove,
            (Transition::Delete, Active | Hidden) => Step::Remove,
            (Transition::Delete, Trashed) => {
                return Err(AppError::Conflict(format!(
                    "article {id} is in the trash; purge it from the trash instead"
                )))
            }
            (Transition::ToggleVisibility | Transition::Purge, _) => {
                return Err(AppError::Conflict(format!(
                    "cannot {} article {id} while it is {}",
                    self.verb(),
                    from.as_str()
                )))
            }
        };
        Ok(step)
    }
}

/// Result of applying one transition to a batch of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionReport {
    pub changed: Vec<ArticleId>,
    pub unchanged: Vec<ArticleId>,
}

impl TransitionReport {
    pub fn affected(&self) -> usize {
        self.changed.len()
    }
}

/// Most ids a single bulk request may name.
pub const MAX_BULK_IDS: usize = 500;

/// Validate a caller-supplied id batch: non-empty, at most [`MAX_BULK_IDS`],
/// positive, duplicates collapsed in first-seen order.
pub fn normalize_ids(ids: &[ArticleId]) -> Result<Vec<ArticleId>> {
    if ids.is_empty() {
        return Err(AppError::Validation("article id list must not be empty".into()));
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(AppError::Validation(format!(
            "at most {MAX_BULK_IDS} article ids per request, got {}",
            ids.len()
        )));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    let mut out = Vec::with_capacity(ids.len());
    for &id in ids {
        if id <= 0 {
            return Err(AppError::Validation(format!("invalid article id {id}")));
        }
        if seen.insert(id) {
            out.push(id);
        }
    }
    Ok(out)
}
