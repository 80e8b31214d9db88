//! Compile a scan spec and report what the compiler noticed.

use scanspec_domain::{ScanSpec, ScanSpecBuilder, SpecDiagnostic};
use scanspec_ports::{LoggerPort, log_fields};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Dependencies required by spec compilation.
#[derive(Clone, Default)]
pub struct CompileSpecDeps {
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Serializable view of a compiled spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecSummary {
    /// Whitelisted namespace path prefixes.
    pub whitelisted_path_prefixes: BTreeSet<String>,
    /// Blacklisted namespace path prefixes.
    pub blacklisted_path_prefixes: BTreeSet<String>,
    /// Blacklisted dotted namespace prefixes.
    pub blacklisted_package_prefixes: BTreeSet<String>,
    /// Whitelisted single-unit paths.
    pub whitelisted_unit_paths: BTreeSet<String>,
    /// Parent directories of whitelisted single units.
    pub whitelisted_unit_parents: BTreeSet<String>,
    /// Blacklisted single-unit paths.
    pub blacklisted_unit_paths: BTreeSet<String>,
    /// Whitelisted archive leaf names.
    pub whitelisted_archives: BTreeSet<String>,
    /// Blacklisted archive leaf names.
    pub blacklisted_archives: BTreeSet<String>,
    /// Whitelisted archive globs.
    pub whitelisted_archive_patterns: Vec<String>,
    /// Blacklisted archive globs.
    pub blacklisted_archive_patterns: Vec<String>,
    /// Whether archives are scanned.
    pub scan_archives: bool,
    /// Whether loose directory trees are scanned.
    pub scan_loose_trees: bool,
    /// Whether system namespaces are excluded.
    pub blacklist_system_packages: bool,
    /// Whether system archives are excluded.
    pub blacklist_system_archives: bool,
    /// Whether non-public fields are matched.
    pub ignore_field_visibility: bool,
    /// Compiler findings.
    pub diagnostics: Vec<SpecDiagnostic>,
}

impl SpecSummary {
    /// Snapshot a compiled spec.
    #[must_use]
    pub fn of(spec: &ScanSpec) -> Self {
        let archives = spec.archives();
        Self {
            whitelisted_path_prefixes: spec.whitelisted_path_prefixes().clone(),
            blacklisted_path_prefixes: spec.blacklisted_path_prefixes().clone(),
            blacklisted_package_prefixes: spec.blacklisted_package_prefixes().clone(),
            whitelisted_unit_paths: spec.whitelisted_unit_paths().clone(),
            whitelisted_unit_parents: spec.whitelisted_unit_parents().clone(),
            blacklisted_unit_paths: spec.blacklisted_unit_paths().clone(),
            whitelisted_archives: archives.whitelisted_names().clone(),
            blacklisted_archives: archives.blacklisted_names().clone(),
            whitelisted_archive_patterns: archives
                .whitelisted_patterns()
                .iter()
                .map(|pattern| pattern.as_str().to_owned())
                .collect(),
            blacklisted_archive_patterns: archives
                .blacklisted_patterns()
                .iter()
                .map(|pattern| pattern.as_str().to_owned())
                .collect(),
            scan_archives: spec.scan_archives(),
            scan_loose_trees: spec.scan_loose_trees(),
            blacklist_system_packages: spec.blacklists_system_packages(),
            blacklist_system_archives: spec.blacklists_system_archives(),
            ignore_field_visibility: spec.ignore_field_visibility(),
            diagnostics: spec.diagnostics().to_vec(),
        }
    }
}

/// Build the spec, logging each diagnostic and a summary.
pub fn compile_spec(deps: &CompileSpecDeps, builder: ScanSpecBuilder) -> Arc<ScanSpec> {
    let spec = builder.build();
    if let Some(logger) = deps.logger.as_deref() {
        for diagnostic in spec.diagnostics() {
            logger.warn(
                "spec.diagnostic",
                &diagnostic.to_string(),
                Some(log_fields([("code", Value::from(diagnostic.code()))])),
            );
        }
        logger.debug(
            "spec.compiled",
            "Scan spec compiled",
            Some(log_fields_compiled(&spec)),
        );
    }
    Arc::new(spec)
}

fn log_fields_compiled(spec: &ScanSpec) -> scanspec_ports::LogFields {
    log_fields([
        (
            "whitelistedPrefixes",
            Value::from(spec.whitelisted_path_prefixes().len()),
        ),
        (
            "blacklistedPrefixes",
            Value::from(spec.blacklisted_path_prefixes().len()),
        ),
        ("whitelistedUnits", Value::from(spec.whitelisted_unit_paths().len())),
        ("blacklistedUnits", Value::from(spec.blacklisted_unit_paths().len())),
        ("scanArchives", Value::from(spec.scan_archives())),
        ("scanLooseTrees", Value::from(spec.scan_loose_trees())),
        ("diagnostics", Value::from(spec.diagnostics().len())),
    ])
}
