//! # scanspec-shared
//!
//! Result and error envelope types used across the scanspec workspace.
//!
//! Every crate above this one reports failures as an [`ErrorEnvelope`] so the
//! CLI and log sinks can render them uniformly.
//!
//! ## Design Principles
//!
//! 1. **No workspace dependencies** - This crate only depends on external crates
//! 2. **Serde-compatible** - Envelopes serialize for structured logs and JSON output

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod errors;
pub mod result;

pub use errors::{
    ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, UnexpectedError,
    normalize_unexpected_error,
};
pub use result::{Result, ResultExt};

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
