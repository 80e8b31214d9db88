//! Spec inspection commands: compile, classify, check-unit, check-archive.

use super::{CommandError, Session, to_pretty_json};
use crate::CliOutput;
use crate::format::OutputMode;
use scanspec_app::SpecSummary;
use scanspec_domain::PathMatch;
use scanspec_shared::ErrorEnvelope;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Compile tokens and print the normalized rule sets and diagnostics.
pub fn run_compile(
    session: &Session,
    tokens: &[String],
    mode: OutputMode,
) -> Result<CliOutput, CommandError> {
    let spec = session.compile(tokens);
    let summary = SpecSummary::of(&spec);
    if mode.is_json() {
        let payload = serde_json::json!({ "status": "ok", "spec": summary });
        return Ok(CliOutput::ok(to_pretty_json(&payload)?));
    }
    Ok(CliOutput::ok(format_summary_text(&summary)))
}

fn push_set(output: &mut String, label: &str, values: &BTreeSet<String>) {
    push_list(output, label, values.iter().map(String::as_str));
}

fn push_list<'a>(output: &mut String, label: &str, values: impl Iterator<Item = &'a str>) {
    let joined = values.collect::<Vec<_>>().join(", ");
    let shown = if joined.is_empty() { "-" } else { &joined };
    let _ = writeln!(output, "{label}: {shown}");
}

fn format_summary_text(summary: &SpecSummary) -> String {
    let mut output = String::from("status: ok\n");
    push_set(&mut output, "whitelistedPathPrefixes", &summary.whitelisted_path_prefixes);
    push_set(&mut output, "blacklistedPathPrefixes", &summary.blacklisted_path_prefixes);
    push_set(&mut output, "whitelistedUnitPaths", &summary.whitelisted_unit_paths);
    push_set(&mut output, "whitelistedUnitParents", &summary.whitelisted_unit_parents);
    push_set(&mut output, "blacklistedUnitPaths", &summary.blacklisted_unit_paths);
    push_set(&mut output, "whitelistedArchives", &summary.whitelisted_archives);
    push_set(&mut output, "blacklistedArchives", &summary.blacklisted_archives);
    push_list(
        &mut output,
        "whitelistedArchivePatterns",
        summary.whitelisted_archive_patterns.iter().map(String::as_str),
    );
    push_list(
        &mut output,
        "blacklistedArchivePatterns",
        summary.blacklisted_archive_patterns.iter().map(String::as_str),
    );
    let _ = writeln!(output, "scanArchives: {}", summary.scan_archives);
    let _ = writeln!(output, "scanLooseTrees: {}", summary.scan_loose_trees);
    let _ = writeln!(output, "blacklistSystemPackages: {}", summary.blacklist_system_packages);
    let _ = writeln!(output, "blacklistSystemArchives: {}", summary.blacklist_system_archives);
    let _ = writeln!(output, "ignoreFieldVisibility: {}", summary.ignore_field_visibility);
    for diagnostic in &summary.diagnostics {
        let _ = writeln!(output, "diagnostic: {}: {diagnostic}", diagnostic.code());
    }
    output
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PathOutcome<'a> {
    path: &'a str,
    outcome: PathMatch,
    descend: bool,
}

/// Classify each path; a trailing `/` (or an empty path) marks a directory.
pub fn run_classify(
    session: &Session,
    spec_tokens: &[String],
    paths: &[String],
    mode: OutputMode,
) -> Result<CliOutput, CommandError> {
    let spec = session.compile(spec_tokens);
    let outcomes: Vec<PathOutcome<'_>> = paths
        .iter()
        .map(|path| {
            let outcome = spec.classify_any(path);
            PathOutcome {
                path,
                outcome,
                descend: outcome.should_descend(),
            }
        })
        .collect();

    if mode.is_json() {
        let payload = serde_json::json!({ "status": "ok", "results": outcomes });
        return Ok(CliOutput::ok(to_pretty_json(&payload)?));
    }
    let mut output = String::new();
    for outcome in &outcomes {
        let _ = writeln!(output, "{}\t{}", outcome.path, outcome.outcome);
    }
    Ok(CliOutput::ok(output))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnitOutcome<'a> {
    name: &'a str,
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorEnvelope>,
}

/// Check dotted unit names; denied names carry the request rejection.
pub fn run_check_unit(
    session: &Session,
    spec_tokens: &[String],
    names: &[String],
    mode: OutputMode,
) -> Result<CliOutput, CommandError> {
    let spec = session.compile(spec_tokens);
    let outcomes: Vec<UnitOutcome<'_>> = names
        .iter()
        .map(|name| {
            let error = spec.check_requested_unit(name).err().map(ErrorEnvelope::from);
            UnitOutcome {
                name,
                allowed: error.is_none(),
                error,
            }
        })
        .collect();

    if mode.is_json() {
        let payload = serde_json::json!({ "status": "ok", "results": outcomes });
        return Ok(CliOutput::ok(to_pretty_json(&payload)?));
    }
    let mut output = String::new();
    for outcome in &outcomes {
        match &outcome.error {
            None => {
                let _ = writeln!(output, "{}\tallowed", outcome.name);
            },
            Some(error) => {
                let _ = writeln!(output, "{}\tdenied\t{}", outcome.name, error.code);
            },
        }
    }
    Ok(CliOutput::ok(output))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveOutcome<'a> {
    leaf: &'a str,
    allowed: bool,
}

/// Check archive leaf names against the archive rules.
pub fn run_check_archive(
    session: &Session,
    spec_tokens: &[String],
    leaves: &[String],
    mode: OutputMode,
) -> Result<CliOutput, CommandError> {
    let spec = session.compile(spec_tokens);
    let outcomes: Vec<ArchiveOutcome<'_>> = leaves
        .iter()
        .map(|leaf| ArchiveOutcome {
            leaf,
            allowed: spec.archive_allowed(leaf),
        })
        .collect();

    if mode.is_json() {
        let payload = serde_json::json!({ "status": "ok", "results": outcomes });
        return Ok(CliOutput::ok(to_pretty_json(&payload)?));
    }
    let mut output = String::new();
    for outcome in &outcomes {
        let verdict = if outcome.allowed { "allowed" } else { "denied" };
        let _ = writeln!(output, "{}\t{verdict}", outcome.leaf);
    }
    Ok(CliOutput::ok(output))
}
