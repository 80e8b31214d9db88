//! Relative-path classification used to prune a traversal.

use crate::spec::{PATH_SEPARATOR, ScanSpec, parent_prefix};
use serde::Serialize;
use std::fmt;

/// Outcome of classifying a relative path against a [`ScanSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMatch {
    /// The path is at or below a blacklisted namespace.
    WithinBlacklisted,
    /// The path is at or below a whitelisted namespace.
    WithinWhitelisted,
    /// A whitelisted namespace or carve-out lies below this path.
    AncestorOfWhitelisted,
    /// The path holds a specifically whitelisted unit.
    AtWhitelistedUnitParent,
    /// Nothing below this path is in scope.
    NotWithinWhitelisted,
    /// A unit file that is in scope.
    WhitelistedFile,
    /// A unit file that is out of scope.
    NonWhitelistedFile,
}

impl PathMatch {
    /// Whether a traversal should look below a directory with this outcome.
    #[must_use]
    pub const fn should_descend(self) -> bool {
        matches!(
            self,
            Self::WithinWhitelisted | Self::AncestorOfWhitelisted | Self::AtWhitelistedUnitParent
        )
    }

    /// Stable identifier for output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WithinBlacklisted => "within_blacklisted",
            Self::WithinWhitelisted => "within_whitelisted",
            Self::AncestorOfWhitelisted => "ancestor_of_whitelisted",
            Self::AtWhitelistedUnitParent => "at_whitelisted_unit_parent",
            Self::NotWithinWhitelisted => "not_within_whitelisted",
            Self::WhitelistedFile => "whitelisted_file",
            Self::NonWhitelistedFile => "non_whitelisted_file",
        }
    }
}

impl fmt::Display for PathMatch {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

impl ScanSpec {
    /// Classify a namespace path (expected to end in `/`).
    ///
    /// The first matching rule wins: blacklisted prefix, whitelisted prefix,
    /// ancestor of a whitelisted prefix, parent of a whitelisted unit, and
    /// ancestor of such a parent. The root is always at least an ancestor.
    #[must_use]
    pub fn classify(&self, relative_path: &str) -> PathMatch {
        if self
            .blacklisted_path_prefixes
            .iter()
            .any(|prefix| relative_path.starts_with(prefix.as_str()))
        {
            return PathMatch::WithinBlacklisted;
        }
        if self
            .whitelisted_path_prefixes
            .iter()
            .any(|prefix| relative_path.starts_with(prefix.as_str()))
        {
            return PathMatch::WithinWhitelisted;
        }
        let root = is_root(relative_path);
        if root
            || self
                .whitelisted_path_prefixes
                .iter()
                .any(|prefix| prefix.starts_with(relative_path))
        {
            return PathMatch::AncestorOfWhitelisted;
        }
        if self.whitelisted_unit_parents.contains(relative_path) {
            return PathMatch::AtWhitelistedUnitParent;
        }
        if self
            .whitelisted_unit_parents
            .iter()
            .any(|parent| parent.starts_with(relative_path))
        {
            return PathMatch::AncestorOfWhitelisted;
        }
        PathMatch::NotWithinWhitelisted
    }

    /// Classify a unit file path.
    ///
    /// A file is in scope when its directory is within a whitelisted namespace
    /// and it is not specifically blacklisted, or when it is itself a
    /// specifically whitelisted unit.
    #[must_use]
    pub fn classify_file(&self, relative_path: &str) -> PathMatch {
        let directory = parent_prefix(relative_path);
        let in_scope = match self.classify(directory) {
            PathMatch::WithinWhitelisted => !self.is_specifically_blacklisted_unit(relative_path),
            PathMatch::WithinBlacklisted => false,
            _ => self.is_specifically_whitelisted_unit(relative_path),
        };
        if in_scope {
            PathMatch::WhitelistedFile
        } else {
            PathMatch::NonWhitelistedFile
        }
    }

    /// Classify either kind of path, using the trailing separator to decide.
    #[must_use]
    pub fn classify_any(&self, relative_path: &str) -> PathMatch {
        if relative_path.is_empty() || relative_path.ends_with(PATH_SEPARATOR) {
            self.classify(relative_path)
        } else {
            self.classify_file(relative_path)
        }
    }

    /// True when the unit file is specifically whitelisted and not blacklisted.
    #[must_use]
    pub fn is_specifically_whitelisted_unit(&self, relative_path: &str) -> bool {
        self.whitelisted_unit_paths.contains(relative_path)
            && !self.blacklisted_unit_paths.contains(relative_path)
    }

    /// True when the unit file is specifically blacklisted.
    #[must_use]
    pub fn is_specifically_blacklisted_unit(&self, relative_path: &str) -> bool {
        self.blacklisted_unit_paths.contains(relative_path)
    }
}
