//! Glob pattern compilation for archive leaf names.

use regex::Regex;
use std::fmt;

/// Wildcard character accepted in archive-name rules.
pub const GLOB_WILDCARD: char = '*';

/// Failure to turn a glob literal into a matcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("glob `{pattern}` could not be compiled: {reason}")]
pub struct GlobError {
    /// Literal that failed to compile.
    pub pattern: String,
    /// Reason reported by the regex engine.
    pub reason: String,
}

/// An anchored whole-string matcher compiled from a literal containing `*`.
///
/// Every character other than `*` matches itself (including `.`); each `*`
/// matches any run of characters, possibly empty.
#[derive(Clone)]
pub struct GlobPattern {
    source: Box<str>,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob literal.
    pub fn compile(pattern: &str) -> Result<Self, GlobError> {
        let body = pattern
            .split(GLOB_WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$")).map_err(|error| GlobError {
            pattern: pattern.to_owned(),
            reason: error.to_string(),
        })?;

        Ok(Self {
            source: pattern.into(),
            regex,
        })
    }

    /// Returns true when the whole candidate matches.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// The literal this pattern was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The anchored regular expression backing the pattern.
    #[must_use]
    pub fn regex_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl PartialEq for GlobPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for GlobPattern {}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("GlobPattern")
            .field(&self.source)
            .finish()
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.source)
    }
}

/// Returns true when a literal should be compiled as a glob.
#[must_use]
pub fn is_glob(literal: &str) -> bool {
    literal.contains(GLOB_WILDCARD)
}
