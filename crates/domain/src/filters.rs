//! Membership predicates for unit names and archive leaf names.

use crate::spec::{NAME_SEPARATOR, PATH_SEPARATOR, SYSTEM_PATH_PREFIXES, ScanSpec};
use scanspec_shared::{ErrorCode, ErrorEnvelope};

/// A directly requested unit name that the spec excludes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The name is blacklisted by the caller's own rules.
    #[error("can't scan for {name}, it is in a blacklisted package")]
    Blacklisted {
        /// Requested dotted name.
        name: String,
    },
    /// The name falls under the default system-namespace exclusion.
    #[error(
        "can't scan for {name}, it is in a blacklisted system package; add \"!\" or \"!!\" to the \
         scan spec to disable system package or system archive blacklisting respectively"
    )]
    BlacklistedSystem {
        /// Requested dotted name.
        name: String,
    },
}

impl RequestError {
    /// Requested name carried by the error.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Blacklisted { name } | Self::BlacklistedSystem { name } => name,
        }
    }

    fn error_code(&self) -> ErrorCode {
        match self {
            Self::Blacklisted { .. } => ErrorCode::new("spec", "blacklisted_unit"),
            Self::BlacklistedSystem { .. } => ErrorCode::new("spec", "blacklisted_system_unit"),
        }
    }
}

impl From<RequestError> for ErrorEnvelope {
    fn from(error: RequestError) -> Self {
        Self::expected(error.error_code(), error.to_string()).with_metadata("unit", error.name())
    }
}

fn is_system_name(name: &str) -> bool {
    SYSTEM_PATH_PREFIXES.iter().any(|prefix| {
        let dotted = prefix.replace(PATH_SEPARATOR, &NAME_SEPARATOR.to_string());
        name.starts_with(&dotted)
    })
}

impl ScanSpec {
    /// False when the name is specifically blacklisted or lies under a
    /// blacklisted namespace.
    #[must_use]
    pub fn unit_allowed(&self, name: &str) -> bool {
        if self.blacklisted_unit_names.contains(name) {
            return false;
        }
        !self
            .blacklisted_package_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// True when the leaf name passes the archive whitelist (if any) and
    /// matches no blacklisted name or glob.
    #[must_use]
    pub fn archive_allowed(&self, leaf_name: &str) -> bool {
        let archives = &self.archives;
        let whitelisted = archives.whitelist_is_empty()
            || archives.whitelisted_names.contains(leaf_name)
            || archives
                .whitelisted_patterns
                .iter()
                .any(|pattern| pattern.matches(leaf_name));
        let blacklisted = archives.blacklisted_names.contains(leaf_name)
            || archives
                .blacklisted_patterns
                .iter()
                .any(|pattern| pattern.matches(leaf_name));
        whitelisted && !blacklisted
    }

    /// Reject a name the caller asked for directly when the spec excludes it.
    pub fn check_requested_unit(&self, name: &str) -> Result<(), RequestError> {
        if self.unit_allowed(name) {
            return Ok(());
        }
        if is_system_name(name) && self.blacklists_system_packages() {
            Err(RequestError::BlacklistedSystem {
                name: name.to_owned(),
            })
        } else {
            Err(RequestError::Blacklisted {
                name: name.to_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanspec_shared::ErrorKind;

    #[test]
    fn specific_unit_blacklist_denies_name() {
        let spec = ScanSpec::compile(["com.foo", "-com.foo.Secret"]);
        assert!(!spec.unit_allowed("com.foo.Secret"));
        assert!(spec.unit_allowed("com.foo.Public"));
        assert!(spec.unit_allowed("com.foo.SecretKeeper"));
    }

    #[test]
    fn package_blacklist_beats_unit_whitelist() {
        let spec = ScanSpec::compile(["-com.secret", "com.secret.Public"]);
        assert!(!spec.unit_allowed("com.secret.Public"));
        assert!(spec.unit_allowed("com.secretive.Thing"));
    }

    #[test]
    fn system_names_are_denied_by_default() {
        let spec = ScanSpec::compile(["com.foo"]);
        assert!(!spec.unit_allowed("java.lang.Object"));
        assert!(ScanSpec::compile(["!"]).unit_allowed("java.lang.Object"));
    }

    #[test]
    fn archive_filter_without_whitelist_uses_blacklist_only() {
        let spec = ScanSpec::compile(["-archive:old-*.jar", "-archive:bad.jar"]);
        assert!(spec.archive_allowed("app.jar"));
        assert!(!spec.archive_allowed("old-1.jar"));
        assert!(!spec.archive_allowed("bad.jar"));
    }

    #[test]
    fn archive_filter_with_whitelist() {
        let spec = ScanSpec::compile([
            "archive:app.jar",
            "archive:lib-*.jar",
            "-archive:lib-test*.jar",
        ]);
        assert!(spec.archive_allowed("app.jar"));
        assert!(spec.archive_allowed("lib-core.jar"));
        assert!(!spec.archive_allowed("lib-testkit.jar"));
        assert!(!spec.archive_allowed("other.jar"));
    }

    #[test]
    fn requested_system_unit_gets_override_hint() {
        let spec = ScanSpec::compile(["com.foo"]);
        let error = spec.check_requested_unit("java.util.List").err();
        assert!(matches!(error, Some(RequestError::BlacklistedSystem { .. })));

        let message = error.map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("\"!\""));
        assert!(message.contains("\"!!\""));
    }

    #[test]
    fn requested_user_blacklisted_unit_is_plain_error() {
        let spec = ScanSpec::compile(["-com.secret"]);
        let error = spec.check_requested_unit("com.secret.Key").err();
        assert!(matches!(error, Some(RequestError::Blacklisted { ref name }) if name == "com.secret.Key"));
        assert!(spec.check_requested_unit("com.open.Key").is_ok());
    }

    #[test]
    fn request_error_converts_to_expected_envelope() {
        let envelope: ErrorEnvelope = RequestError::BlacklistedSystem {
            name: "sun.misc.Unsafe".to_owned(),
        }
        .into();
        assert_eq!(envelope.kind, ErrorKind::Expected);
        assert!(envelope.has_code("spec", "blacklisted_system_unit"));
        assert_eq!(
            envelope.metadata.get("unit").map(String::as_str),
            Some("sun.misc.Unsafe")
        );
    }
}
