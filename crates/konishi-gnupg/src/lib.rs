//! GnuPG status-protocol parsing and trust model.
//!
//! `konishi-gnupg` turns the line-prefixed, machine-readable status stream
//! GnuPG emits during verification (surfaced by `git verify-commit --raw`
//! and `git verify-tag --raw`) into structured signature records, and
//! models the web-of-trust levels those records carry.
//!
//! The crate knows nothing about git; it only understands the status
//! protocol and the trust ordering.

pub mod error;
pub mod parse;
pub mod record;
pub mod trust;

// Re-export primary types for convenience.
pub use error::StatusParseError;
pub use parse::parse_raw_status;
pub use record::{ErrorKind, SignatureRecord};
pub use trust::TrustLevel;
