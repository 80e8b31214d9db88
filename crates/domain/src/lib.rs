//! # scanspec-domain
//!
//! Pure scan-scope rules with no I/O:
//!
//! - **Glob** - anchored archive leaf-name patterns
//! - **Spec** - token parsing and normalization into a [`ScanSpec`]
//! - **Classify** - [`PathMatch`] outcomes for traversal pruning
//! - **Filters** - unit-name and archive-name membership
//! - **Facts** - unit kinds, constant values, and per-unit fact records
//!
//! ## Dependency Rules
//!
//! - Depends only on the `shared` crate
//! - A compiled [`ScanSpec`] is immutable and safe to share across threads

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use scanspec_shared::shared_crate_version;

pub mod classify;
pub mod facts;
pub mod filters;
pub mod glob;
pub mod spec;

pub use classify::PathMatch;
pub use facts::{
    ConstantValue, UnitConstants, UnitFacts, UnitKind, constants_of, split_field_name,
};
pub use filters::RequestError;
pub use glob::{GlobError, GlobPattern, is_glob};
pub use spec::{
    ArchiveRules, PATH_SEPARATOR, SYSTEM_PATH_PREFIXES, ScanSpec, ScanSpecBuilder,
    SpecDiagnostic, UNIT_FILE_SUFFIX, tokens_from_text,
};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
