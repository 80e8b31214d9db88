//! # scanspec-adapters
//!
//! Adapter implementations for ports: loggers, the in-memory unit graph, a
//! graph-backed symbol resolver, and a filesystem resource opener.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod fs;
pub mod graph;
pub mod log_sink;
pub mod logger;
pub mod resolver;
pub mod tracing_logger;

pub use fs::FsResourceOpener;
pub use graph::{InMemoryUnitGraph, parse_facts_json};
pub use log_sink::{LogSink, MemoryLogSink, StderrLogSink};
pub use logger::JsonLogger;
pub use resolver::{GraphBackedResolver, ResolvedUnit};
pub use tracing_logger::TracingLogger;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]" || line == "[dev-dependencies]";
                continue;
            }
            if in_deps && line.starts_with("scanspec-") {
                let key = line.split('=').next().unwrap_or("").trim();
                deps.push(key.split('.').next().unwrap_or("").trim().to_owned());
            }
        }

        deps
    }

    #[test]
    fn adapters_do_not_depend_on_app_or_cli() {
        let forbidden = ["scanspec-app", "scanspec-cli"];
        for dep in workspace_deps() {
            assert!(
                !forbidden.contains(&dep.as_str()),
                "forbidden dependency found: {dep}"
            );
        }
    }

    #[test]
    fn adapters_crate_compiles() {
        assert!(!adapters_crate_version().is_empty());
    }
}
