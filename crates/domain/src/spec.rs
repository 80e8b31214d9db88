//! Scan spec compilation.
//!
//! A scan spec is an unordered list of textual tokens:
//!
//! - `!` keeps the system packages (`java.`, `sun.`) in scope.
//! - `!!` additionally keeps system archives in scope.
//! - `-` before any other token turns it into a blacklist rule.
//! - `archive:<leaf>` (or the `jar:` alias) names an archive by leaf name or
//!   glob; a bare `archive:` restricts scanning to archives and `-archive:`
//!   disables archive scanning.
//! - anything else is a dotted name, read as a single unit when its last
//!   segment starts with an upper-case letter and as a namespace otherwise.
//!
//! [`ScanSpecBuilder`] collects tokens; [`ScanSpecBuilder::build`] normalizes
//! them into an immutable [`ScanSpec`] that can be shared across threads.

use crate::glob::{GlobPattern, is_glob};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Path separator used by relative paths.
pub const PATH_SEPARATOR: char = '/';

/// Separator used by dotted unit and namespace names.
pub const NAME_SEPARATOR: char = '.';

/// Suffix appended to single-unit references to form their relative path.
pub const UNIT_FILE_SUFFIX: &str = ".class";

/// Namespace path prefixes excluded unless `!` or `!!` is given.
pub const SYSTEM_PATH_PREFIXES: [&str; 2] = ["java/", "sun/"];

const BLACKLIST_MARKER: char = '-';
const ARCHIVE_PREFIXES: [&str; 2] = ["archive:", "jar:"];
const KEEP_SYSTEM_PACKAGES: &str = "!";
const KEEP_SYSTEM_ARCHIVES: &str = "!!";
const ROOT_PREFIX: &str = "/";

/// Non-fatal findings produced while compiling a scan spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecDiagnostic {
    /// An archive rule contained a path separator and was skipped.
    ArchiveTokenHasSeparator {
        /// Raw token as supplied.
        token: String,
    },
    /// A blacklist of the root namespace was dropped.
    RootBlacklistIgnored,
    /// Both archive and loose-tree scanning ended up disabled.
    LooseTreeScanningReenabled,
    /// An archive glob failed to compile and was skipped.
    InvalidArchivePattern {
        /// Glob literal.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
}

impl SpecDiagnostic {
    /// Stable identifier for logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ArchiveTokenHasSeparator { .. } => "archive_token_has_separator",
            Self::RootBlacklistIgnored => "root_blacklist_ignored",
            Self::LooseTreeScanningReenabled => "loose_tree_scanning_reenabled",
            Self::InvalidArchivePattern { .. } => "invalid_archive_pattern",
        }
    }
}

impl fmt::Display for SpecDiagnostic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArchiveTokenHasSeparator { token } => write!(
                formatter,
                "only a leaf filename may follow an archive prefix, got `{token}`; ignoring"
            ),
            Self::RootBlacklistIgnored => formatter
                .write_str("ignoring blacklist of the root namespace, it would prevent all scanning"),
            Self::LooseTreeScanningReenabled => formatter.write_str(
                "scanning of archives and loose trees are both disabled; re-enabling loose trees",
            ),
            Self::InvalidArchivePattern { pattern, reason } => {
                write!(formatter, "archive glob `{pattern}` ignored: {reason}")
            },
        }
    }
}

/// Archive leaf-name rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveRules {
    pub(crate) whitelisted_names: BTreeSet<String>,
    pub(crate) blacklisted_names: BTreeSet<String>,
    pub(crate) whitelisted_patterns: Vec<GlobPattern>,
    pub(crate) blacklisted_patterns: Vec<GlobPattern>,
}

impl ArchiveRules {
    /// Exact whitelisted leaf names.
    #[must_use]
    pub const fn whitelisted_names(&self) -> &BTreeSet<String> {
        &self.whitelisted_names
    }

    /// Exact blacklisted leaf names.
    #[must_use]
    pub const fn blacklisted_names(&self) -> &BTreeSet<String> {
        &self.blacklisted_names
    }

    /// Whitelisted leaf globs.
    #[must_use]
    pub fn whitelisted_patterns(&self) -> &[GlobPattern] {
        &self.whitelisted_patterns
    }

    /// Blacklisted leaf globs.
    #[must_use]
    pub fn blacklisted_patterns(&self) -> &[GlobPattern] {
        &self.blacklisted_patterns
    }

    /// True when no archive is named on the whitelist.
    #[must_use]
    pub fn whitelist_is_empty(&self) -> bool {
        self.whitelisted_names.is_empty() && self.whitelisted_patterns.is_empty()
    }
}

/// Single-owner accumulator for spec tokens.
#[derive(Debug, Clone, Default)]
pub struct ScanSpecBuilder {
    tokens: Vec<String>,
    ignore_field_visibility: bool,
}

impl ScanSpecBuilder {
    /// Start an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one raw token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.tokens.push(token.into());
        self
    }

    /// Append several raw tokens.
    #[must_use]
    pub fn tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Index non-public fields as well as public ones.
    #[must_use]
    pub const fn ignore_field_visibility(mut self, ignore: bool) -> Self {
        self.ignore_field_visibility = ignore;
        self
    }

    /// Parse and normalize the collected tokens.
    #[must_use]
    pub fn build(self) -> ScanSpec {
        let mut state = CompileState::default();
        for token in &self.tokens {
            state.accept(token);
        }
        state.finish(self.ignore_field_visibility)
    }
}

#[derive(Debug)]
struct CompileState {
    whitelisted_prefixes: BTreeSet<String>,
    blacklisted_prefixes: BTreeSet<String>,
    whitelisted_unit_paths: BTreeSet<String>,
    blacklisted_unit_paths: BTreeSet<String>,
    blacklisted_unit_names: BTreeSet<String>,
    archives: ArchiveRules,
    scan_archives: bool,
    scan_loose_trees: bool,
    blacklist_system_packages: bool,
    blacklist_system_archives: bool,
    diagnostics: Vec<SpecDiagnostic>,
}

impl Default for CompileState {
    fn default() -> Self {
        Self {
            whitelisted_prefixes: BTreeSet::new(),
            blacklisted_prefixes: BTreeSet::new(),
            whitelisted_unit_paths: BTreeSet::new(),
            blacklisted_unit_paths: BTreeSet::new(),
            blacklisted_unit_names: BTreeSet::new(),
            archives: ArchiveRules::default(),
            scan_archives: true,
            scan_loose_trees: true,
            blacklist_system_packages: true,
            blacklist_system_archives: true,
            diagnostics: Vec::new(),
        }
    }
}

impl CompileState {
    fn accept(&mut self, token: &str) {
        match token {
            KEEP_SYSTEM_PACKAGES => self.blacklist_system_packages = false,
            KEEP_SYSTEM_ARCHIVES => {
                self.blacklist_system_archives = false;
                self.blacklist_system_packages = false;
            },
            _ => {
                let (blacklisted, body) = token
                    .strip_prefix(BLACKLIST_MARKER)
                    .map_or((false, token), |rest| (true, rest));
                match strip_archive_prefix(body) {
                    Some(leaf) => self.accept_archive(token, leaf, blacklisted),
                    None => self.accept_name(body, blacklisted),
                }
            },
        }
    }

    fn accept_archive(&mut self, token: &str, leaf: &str, blacklisted: bool) {
        if leaf.contains(PATH_SEPARATOR) {
            self.diagnostics
                .push(SpecDiagnostic::ArchiveTokenHasSeparator {
                    token: token.to_owned(),
                });
            return;
        }
        if leaf.is_empty() {
            if blacklisted {
                self.scan_archives = false;
            } else {
                self.scan_loose_trees = false;
            }
            return;
        }
        if is_glob(leaf) {
            match GlobPattern::compile(leaf) {
                Ok(pattern) if blacklisted => self.archives.blacklisted_patterns.push(pattern),
                Ok(pattern) => self.archives.whitelisted_patterns.push(pattern),
                Err(error) => self.diagnostics.push(SpecDiagnostic::InvalidArchivePattern {
                    pattern: error.pattern,
                    reason: error.reason,
                }),
            }
        } else if blacklisted {
            self.archives.blacklisted_names.insert(leaf.to_owned());
        } else {
            self.archives.whitelisted_names.insert(leaf.to_owned());
        }
    }

    fn accept_name(&mut self, name: &str, blacklisted: bool) {
        let path = name.replace(NAME_SEPARATOR, ROOT_PREFIX);
        if names_single_unit(&path) {
            let unit_path = format!("{path}{UNIT_FILE_SUFFIX}");
            if blacklisted {
                self.blacklisted_unit_names.insert(name.to_owned());
                self.blacklisted_unit_paths.insert(unit_path);
            } else {
                self.whitelisted_unit_paths.insert(unit_path);
            }
        } else {
            let prefix = format!("{path}{PATH_SEPARATOR}");
            if blacklisted {
                self.blacklisted_prefixes.insert(prefix);
            } else {
                self.whitelisted_prefixes.insert(prefix);
            }
        }
    }

    fn finish(mut self, ignore_field_visibility: bool) -> ScanSpec {
        if self.blacklisted_prefixes.remove(ROOT_PREFIX) {
            self.diagnostics.push(SpecDiagnostic::RootBlacklistIgnored);
        }
        self.whitelisted_prefixes
            .retain(|prefix| !self.blacklisted_prefixes.contains(prefix));
        let archive_blacklist = std::mem::take(&mut self.archives.blacklisted_names);
        self.archives
            .whitelisted_names
            .retain(|name| !archive_blacklist.contains(name));
        self.archives.blacklisted_names = archive_blacklist;

        if !self.archives.whitelist_is_empty() {
            self.scan_loose_trees = false;
        }
        if !self.scan_archives && !self.scan_loose_trees {
            self.diagnostics
                .push(SpecDiagnostic::LooseTreeScanningReenabled);
            self.scan_loose_trees = true;
        }

        if self.whitelisted_prefixes.is_empty() || self.whitelisted_prefixes.contains(ROOT_PREFIX) {
            self.whitelisted_prefixes = BTreeSet::from([String::new()]);
        }
        if self.blacklist_system_packages {
            self.blacklisted_prefixes
                .extend(SYSTEM_PATH_PREFIXES.iter().map(|prefix| (*prefix).to_owned()));
        }
        let blacklisted_package_prefixes = self
            .blacklisted_prefixes
            .iter()
            .map(|prefix| prefix.replace(PATH_SEPARATOR, "."))
            .collect();

        // A specifically blacklisted unit must not open a carve-out for its parent.
        self.whitelisted_unit_paths
            .retain(|path| !self.blacklisted_unit_paths.contains(path));
        let whitelisted_unit_parents = self
            .whitelisted_unit_paths
            .iter()
            .map(|path| parent_prefix(path).to_owned())
            .collect();

        ScanSpec {
            whitelisted_path_prefixes: self.whitelisted_prefixes,
            blacklisted_path_prefixes: self.blacklisted_prefixes,
            blacklisted_package_prefixes,
            whitelisted_unit_paths: self.whitelisted_unit_paths,
            whitelisted_unit_parents,
            blacklisted_unit_paths: self.blacklisted_unit_paths,
            blacklisted_unit_names: self.blacklisted_unit_names,
            archives: self.archives,
            scan_archives: self.scan_archives,
            scan_loose_trees: self.scan_loose_trees,
            blacklist_system_packages: self.blacklist_system_packages,
            blacklist_system_archives: self.blacklist_system_archives,
            ignore_field_visibility,
            diagnostics: self.diagnostics,
        }
    }
}

fn strip_archive_prefix(body: &str) -> Option<&str> {
    ARCHIVE_PREFIXES
        .iter()
        .find_map(|prefix| body.strip_prefix(prefix))
}

/// True when the final path segment starts with an upper-case character.
fn names_single_unit(path: &str) -> bool {
    let leaf_start = path.rfind(PATH_SEPARATOR).map_or(0, |index| index + 1);
    path.get(leaf_start..)
        .and_then(|leaf| leaf.chars().next())
        .is_some_and(char::is_uppercase)
}

/// Everything up to and including the last separator (empty at the root).
pub(crate) fn parent_prefix(path: &str) -> &str {
    path.rfind(PATH_SEPARATOR)
        .and_then(|index| path.get(..=index))
        .unwrap_or("")
}

/// Split raw spec text into tokens on whitespace and commas.
pub fn tokens_from_text(text: &str) -> Vec<String> {
    text.split(|character: char| character == ',' || character.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Compiled, immutable scan rules.
///
/// Rule sets are sorted so summaries and serialized output are stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSpec {
    pub(crate) whitelisted_path_prefixes: BTreeSet<String>,
    pub(crate) blacklisted_path_prefixes: BTreeSet<String>,
    pub(crate) blacklisted_package_prefixes: BTreeSet<String>,
    pub(crate) whitelisted_unit_paths: BTreeSet<String>,
    pub(crate) whitelisted_unit_parents: BTreeSet<String>,
    pub(crate) blacklisted_unit_paths: BTreeSet<String>,
    pub(crate) blacklisted_unit_names: BTreeSet<String>,
    pub(crate) archives: ArchiveRules,
    scan_archives: bool,
    scan_loose_trees: bool,
    blacklist_system_packages: bool,
    blacklist_system_archives: bool,
    ignore_field_visibility: bool,
    diagnostics: Vec<SpecDiagnostic>,
}

impl ScanSpec {
    /// Compile a token list with default options.
    pub fn compile<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScanSpecBuilder::new().tokens(tokens).build()
    }

    /// Whitelisted namespace path prefixes; `""` means everything.
    #[must_use]
    pub const fn whitelisted_path_prefixes(&self) -> &BTreeSet<String> {
        &self.whitelisted_path_prefixes
    }

    /// Blacklisted namespace path prefixes, system prefixes included.
    #[must_use]
    pub const fn blacklisted_path_prefixes(&self) -> &BTreeSet<String> {
        &self.blacklisted_path_prefixes
    }

    /// Blacklisted namespace prefixes in dotted form.
    #[must_use]
    pub const fn blacklisted_package_prefixes(&self) -> &BTreeSet<String> {
        &self.blacklisted_package_prefixes
    }

    /// Relative paths of specifically whitelisted units.
    #[must_use]
    pub const fn whitelisted_unit_paths(&self) -> &BTreeSet<String> {
        &self.whitelisted_unit_paths
    }

    /// Parent prefixes of specifically whitelisted units.
    #[must_use]
    pub const fn whitelisted_unit_parents(&self) -> &BTreeSet<String> {
        &self.whitelisted_unit_parents
    }

    /// Relative paths of specifically blacklisted units.
    #[must_use]
    pub const fn blacklisted_unit_paths(&self) -> &BTreeSet<String> {
        &self.blacklisted_unit_paths
    }

    /// Dotted names of specifically blacklisted units.
    #[must_use]
    pub const fn blacklisted_unit_names(&self) -> &BTreeSet<String> {
        &self.blacklisted_unit_names
    }

    /// Archive leaf-name rules.
    #[must_use]
    pub const fn archives(&self) -> &ArchiveRules {
        &self.archives
    }

    /// Whether archives are scanned at all.
    #[must_use]
    pub const fn scan_archives(&self) -> bool {
        self.scan_archives
    }

    /// Whether loose directory trees are scanned.
    #[must_use]
    pub const fn scan_loose_trees(&self) -> bool {
        self.scan_loose_trees
    }

    /// Whether the system namespaces are excluded.
    #[must_use]
    pub const fn blacklists_system_packages(&self) -> bool {
        self.blacklist_system_packages
    }

    /// Whether system archives are excluded.
    #[must_use]
    pub const fn blacklists_system_archives(&self) -> bool {
        self.blacklist_system_archives
    }

    /// Whether non-public fields are indexed and matched.
    #[must_use]
    pub const fn ignore_field_visibility(&self) -> bool {
        self.ignore_field_visibility
    }

    /// Non-fatal findings from compilation, in token order.
    #[must_use]
    pub fn diagnostics(&self) -> &[SpecDiagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn empty_spec_whitelists_everything_and_blacklists_system() {
        let spec = ScanSpec::compile(Vec::<String>::new());
        assert_eq!(spec.whitelisted_path_prefixes(), &set(&[""]));
        assert_eq!(spec.blacklisted_path_prefixes(), &set(&["java/", "sun/"]));
        assert_eq!(spec.blacklisted_package_prefixes(), &set(&["java.", "sun."]));
        assert!(spec.scan_archives());
        assert!(spec.scan_loose_trees());
        assert!(spec.diagnostics().is_empty());
    }

    #[test]
    fn namespace_and_unit_tokens_are_separated() {
        let spec = ScanSpec::compile(["com.foo", "-com.foo.Secret", "org.bar.Widget"]);
        assert_eq!(spec.whitelisted_path_prefixes(), &set(&["com/foo/"]));
        assert_eq!(spec.blacklisted_unit_paths(), &set(&["com/foo/Secret.class"]));
        assert_eq!(spec.blacklisted_unit_names(), &set(&["com.foo.Secret"]));
        assert_eq!(spec.whitelisted_unit_paths(), &set(&["org/bar/Widget.class"]));
        assert_eq!(spec.whitelisted_unit_parents(), &set(&["org/bar/"]));
    }

    #[test]
    fn top_level_unit_has_root_parent() {
        let spec = ScanSpec::compile(["Main"]);
        assert_eq!(spec.whitelisted_unit_paths(), &set(&["Main.class"]));
        assert_eq!(spec.whitelisted_unit_parents(), &set(&[""]));
    }

    #[test]
    fn root_blacklist_is_dropped_with_diagnostic() {
        let spec = ScanSpec::compile(["-", "com.foo"]);
        assert_eq!(spec.diagnostics(), &[SpecDiagnostic::RootBlacklistIgnored]);
        assert!(!spec.blacklisted_path_prefixes().contains("/"));
        assert_eq!(spec.blacklisted_path_prefixes(), &set(&["java/", "sun/"]));
    }

    #[test]
    fn root_whitelist_means_everything() {
        let spec = ScanSpec::compile(["", "com.foo"]);
        assert_eq!(spec.whitelisted_path_prefixes(), &set(&[""]));
    }

    #[test]
    fn blacklist_wins_over_equal_whitelist() {
        let spec = ScanSpec::compile(["com.foo", "com.bar", "-com.foo"]);
        assert_eq!(spec.whitelisted_path_prefixes(), &set(&["com/bar/"]));
        assert!(spec.blacklisted_path_prefixes().contains("com/foo/"));
        assert!(spec.blacklisted_package_prefixes().contains("com.foo."));
    }

    #[test]
    fn blacklisting_only_whitelist_falls_back_to_everything() {
        let spec = ScanSpec::compile(["com.foo", "-com.foo"]);
        assert_eq!(spec.whitelisted_path_prefixes(), &set(&[""]));
    }

    #[test]
    fn specifically_blacklisted_unit_leaves_no_parent_carve_out() {
        let spec = ScanSpec::compile(["org.bar.Widget", "-org.bar.Widget"]);
        assert!(spec.whitelisted_unit_paths().is_empty());
        assert!(spec.whitelisted_unit_parents().is_empty());
    }

    #[test]
    fn single_bang_keeps_system_packages_only() {
        let spec = ScanSpec::compile(["!"]);
        assert!(!spec.blacklists_system_packages());
        assert!(spec.blacklists_system_archives());
        assert!(spec.blacklisted_path_prefixes().is_empty());
    }

    #[test]
    fn double_bang_keeps_system_packages_and_archives() {
        let spec = ScanSpec::compile(["!!"]);
        assert!(!spec.blacklists_system_packages());
        assert!(!spec.blacklists_system_archives());
    }

    #[test]
    fn archive_tokens_fill_names_and_patterns() {
        let spec = ScanSpec::compile([
            "archive:app.jar",
            "jar:lib-*.jar",
            "-archive:lib-test*.jar",
            "-jar:old.jar",
        ]);
        let archives = spec.archives();
        assert_eq!(archives.whitelisted_names(), &set(&["app.jar"]));
        assert_eq!(archives.blacklisted_names(), &set(&["old.jar"]));
        assert_eq!(archives.whitelisted_patterns().len(), 1);
        assert_eq!(archives.blacklisted_patterns().len(), 1);
        assert!(!spec.scan_loose_trees(), "named archives restrict the scan");
        assert!(spec.scan_archives());
    }

    #[test]
    fn archive_in_both_lists_is_removed_from_whitelist() {
        let spec = ScanSpec::compile(["archive:a.jar", "archive:b.jar", "-archive:a.jar"]);
        assert_eq!(spec.archives().whitelisted_names(), &set(&["b.jar"]));
        assert_eq!(spec.archives().blacklisted_names(), &set(&["a.jar"]));
    }

    #[test]
    fn archive_token_with_separator_is_rejected() {
        let spec = ScanSpec::compile(["archive:lib/a.jar"]);
        assert_eq!(
            spec.diagnostics(),
            &[SpecDiagnostic::ArchiveTokenHasSeparator {
                token: "archive:lib/a.jar".to_owned()
            }]
        );
        assert!(spec.archives().whitelist_is_empty());
        assert!(spec.scan_loose_trees());
    }

    #[test]
    fn bare_archive_prefix_toggles_scan_modes() {
        let archives_only = ScanSpec::compile(["archive:"]);
        assert!(archives_only.scan_archives());
        assert!(!archives_only.scan_loose_trees());

        let no_archives = ScanSpec::compile(["-archive:"]);
        assert!(!no_archives.scan_archives());
        assert!(no_archives.scan_loose_trees());
    }

    #[test]
    fn disabling_both_scan_modes_reenables_loose_trees() {
        let spec = ScanSpec::compile(["archive:", "-archive:"]);
        assert!(!spec.scan_archives());
        assert!(spec.scan_loose_trees());
        assert_eq!(
            spec.diagnostics(),
            &[SpecDiagnostic::LooseTreeScanningReenabled]
        );
    }

    #[test]
    fn builder_carries_field_visibility() {
        let spec = ScanSpecBuilder::new()
            .token("com.foo")
            .ignore_field_visibility(true)
            .build();
        assert!(spec.ignore_field_visibility());
        assert!(!ScanSpec::compile(["com.foo"]).ignore_field_visibility());
    }

    #[test]
    fn tokens_from_text_splits_on_commas_and_whitespace() {
        assert_eq!(
            tokens_from_text(" com.foo,-com.foo.Secret\n archive:a.jar ,, !"),
            vec!["com.foo", "-com.foo.Secret", "archive:a.jar", "!"]
        );
        assert!(tokens_from_text("  ").is_empty());
    }

    #[test]
    fn compiled_spec_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScanSpec>();
    }
}
