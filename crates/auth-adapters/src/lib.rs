//! # auth-adapters
//!
//! Implementations of the credential hashing and session token ports.

pub mod argon;
#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use argon::Argon2Hasher;
#[cfg(feature = "auth-jwt")]
pub use jwt::JwtCodec;
