//! # Permission Evaluator
//!
//! Admins pass every check. Editors pass only for capabilities in their set.
//! There is no anonymous identity: handlers that mutate state must hold an
//! [`Identity`] before they can ask.

use crate::error::{AppError, Result};
use crate::models::{Capability, Identity, Role};

/// What a guarded operation demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Admin,
    Capability(Capability),
    /// Any one of the listed capabilities suffices.
    AnyOf(&'static [Capability]),
}

/// `true` when `identity` may exercise `capability`.
pub fn allowed(identity: &Identity, capability: Capability) -> bool {
    match &identity.role {
        Role::Admin => true,
        Role::Editor(caps) => caps.contains(&capability),
    }
}

pub fn satisfies(identity: &Identity, requirement: Requirement) -> bool {
    match requirement {
        Requirement::Admin => identity.role.is_admin(),
        Requirement::Capability(cap) => allowed(identity, cap),
        Requirement::AnyOf(caps) => caps.iter().any(|cap| allowed(identity, *cap)),
    }
}

/// Gate used by every state-changing service call.
pub fn authorize(identity: &Identity, requirement: Requirement) -> Result<()> {
    if satisfies(identity, requirement) {
        return Ok(());
    }
    let needed = match requirement {
        Requirement::Admin => "administrator role".to_string(),
        Requirement::Capability(cap) => format!("'{cap}' capability"),
        Requirement::AnyOf(caps) => caps
            .iter()
            .map(|c| format!("'{c}'"))
            .collect::<Vec<_>>()
            .join(" or "),
    };
    Err(AppError::Authorization(format!(
        "{} requires {needed}",
        identity.username
    )))
}
