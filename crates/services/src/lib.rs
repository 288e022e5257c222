//! newsroom/crates/services/src/lib.rs
//!
//! Use-case layer. Every service is constructed with explicit port handles
//! and stays storage-agnostic.

pub mod accounts;
pub mod articles;
pub mod audit;
pub mod blocklist;
pub mod notify;
pub mod password_reset;
pub mod settings;
pub mod utils;

pub use accounts::{AccountService, CreateUser, EditUser, LoginOutcome};
pub use articles::{ArticleQuery, ArticleService};
pub use audit::AuditRecorder;
pub use blocklist::Blocklist;
pub use notify::LogResetNotifier;
pub use password_reset::{PasswordResetFlow, ResetTicket, RESET_TOKEN_TTL_MINUTES};
pub use settings::SettingsLedger;
