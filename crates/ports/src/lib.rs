//! # scanspec-ports
//!
//! Boundary traits between the dispatch core and its collaborators: the
//! completed unit graph, symbol resolution, resource opening, and logging.
//! Depends only on `domain` and `shared`.

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod graph;
pub mod logger;
pub mod resolver;
pub mod resource;

pub use graph::UnitGraphPort;
pub use logger::{LogEvent, LogFields, LogLevel, LoggerPort, log_fields};
pub use resolver::SymbolResolverPort;
pub use resource::{ResourceOpenerPort, ScannedResource};

// Re-export domain types used in port signatures.
pub use scanspec_domain::UnitKind;
