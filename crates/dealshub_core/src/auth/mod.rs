//! Passwordless authentication primitives.
//!
//! # Responsibility
//! - Issue and check single-use magic-link tokens.
//! - Sign and verify stateless session tokens.
//!
//! # Invariants
//! - Raw magic tokens are never persisted; only their SHA-256 digest is.
//! - Session verification is constant-time over the MAC.

pub mod magic_link;
pub mod session;

pub use magic_link::{hash_token, MagicToken, MAGIC_TOKEN_TTL_MS};
pub use session::{SessionClaims, SessionError, SessionSigner, SESSION_TTL_MS};
