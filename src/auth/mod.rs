//! User authentication module: register-number + PIN accounts.
//!
//! Provides:
//! - Student registration with register number, name, and PIN
//! - Login by register number (case-insensitive) with constant-time PIN check
//! - SQLite-backed persistent storage
//!
//! ## Design Decisions
//! - PIN hashing uses iterated SHA-256 (100k rounds) + per-user salt via the
//!   existing `sha2` crate; the plaintext PIN is never stored and cannot be
//!   recovered from the hash.
//! - No session tokens — a successful login returns the numeric user id and
//!   the client holds onto it. Session management is explicitly out of scope.

pub mod store;

pub use store::{Account, AuthStore};
