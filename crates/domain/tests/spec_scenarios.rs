//! Integration coverage for compiled scan specs used end to end.

use scanspec_domain::{PathMatch, RequestError, ScanSpec, SpecDiagnostic, tokens_from_text};
use scanspec_shared::ErrorEnvelope;
use std::error::Error;

#[test]
fn whitelisted_namespace_with_blacklisted_unit() {
    let spec = ScanSpec::compile(["com.foo", "-com.foo.Secret"]);

    assert_eq!(spec.classify("com/foo/"), PathMatch::WithinWhitelisted);
    assert!(spec.is_specifically_blacklisted_unit("com/foo/Secret.class"));
    assert!(!spec.unit_allowed("com.foo.Secret"));
    assert!(spec.unit_allowed("com.foo.Other"));
}

#[test]
fn blacklisted_namespace_with_whitelisted_unit() {
    let spec = ScanSpec::compile(["-com.secret", "com.secret.Public"]);

    assert!(spec.whitelisted_unit_paths().contains("com/secret/Public.class"));
    assert!(!spec.unit_allowed("com.secret.Public"));
    assert_eq!(spec.classify("com/secret/"), PathMatch::WithinBlacklisted);
}

#[test]
fn root_blacklist_behaves_like_no_blacklist() {
    let with_root = ScanSpec::compile(["-", "com.foo"]);
    let without = ScanSpec::compile(["com.foo"]);

    assert!(with_root
        .diagnostics()
        .contains(&SpecDiagnostic::RootBlacklistIgnored));
    for path in ["/", "com/", "com/foo/", "com/foo/x/", "org/", "java/"] {
        assert_eq!(with_root.classify(path), without.classify(path), "path {path}");
    }
}

#[test]
fn text_spec_compiles_like_token_list() {
    let from_text = ScanSpec::compile(tokens_from_text("com.foo, -com.foo.internal archive:app.jar"));
    let from_tokens = ScanSpec::compile(["com.foo", "-com.foo.internal", "archive:app.jar"]);

    assert_eq!(from_text, from_tokens);
}

#[test]
fn direct_request_errors_become_envelopes() -> Result<(), Box<dyn Error>> {
    let spec = ScanSpec::compile(["com.foo"]);
    let error = spec
        .check_requested_unit("sun.misc.Unsafe")
        .err()
        .ok_or("system unit should be rejected")?;
    assert!(matches!(error, RequestError::BlacklistedSystem { .. }));

    let envelope: ErrorEnvelope = error.into();
    assert_eq!(envelope.code.namespace(), "spec");
    assert_eq!(envelope.code.code(), "blacklisted_system_unit");
    Ok(())
}
