//! newsroom/crates/domains/src/lib.rs
//!
//! The central domain model and port definitions for the newsroom backend:
//! identities and capabilities, the article lifecycle, and the storage
//! contracts every adapter implements.

pub mod error;
pub mod lifecycle;
pub mod models;
pub mod permission;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use lifecycle::{normalize_ids, Step, Transition, TransitionReport, MAX_BULK_IDS};
pub use models::*;
pub use permission::{allowed, authorize, satisfies, Requirement};
pub use traits::*;
