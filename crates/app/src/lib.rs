//! # scanspec-app
//!
//! Application use cases: compiling a scan spec, recording matchers while a
//! scan is configured, and dispatching them once the unit graph is complete.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod compile_spec;
pub mod dispatch;
pub mod files;
pub mod registry;
pub mod request;

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use compile_spec::{CompileSpecDeps, SpecSummary, compile_spec};
pub use dispatch::{
    DispatchDeps, DispatchFailure, DispatchReport, FailureStage, filtered_query,
};
pub use files::{
    FileMatchCallback, FileMatchFailure, FileMatchReport, FileMatcher, FilePathTest,
};
pub use registry::{
    FieldCallback, FieldMatchIndex, MatcherId, MatcherRegistry, SealedRegistry, UnitCallback,
    UnitMatcher, UnitQuery,
};
pub use request::resolve_requested_unit;
