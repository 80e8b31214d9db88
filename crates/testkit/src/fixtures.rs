//! Fixture files and sample unit graphs.

use scanspec_domain::{ConstantValue, UnitFacts, UnitKind};
use std::path::PathBuf;

/// Absolute path of a file under `crates/testkit/fixtures`.
pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(relative)
}

/// Read a fixture file as text.
pub fn fixture_text(relative: &str) -> String {
    let path = fixture_path(relative);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|error| panic!("fixture {} unreadable: {error}", path.display()))
}

/// A small plugin hierarchy spanning an open and a blacklisted namespace.
///
/// - `com.example.Plugin` (interface) ← `com.example.NamedPlugin` (interface)
/// - `com.example.BasePlugin` implements `NamedPlugin`
/// - `com.example.impl.FastPlugin`, `com.example.internal.HiddenPlugin` extend it
/// - `com.example.Settings` carries constants and `com.example.Managed`
pub fn sample_facts() -> Vec<UnitFacts> {
    vec![
        UnitFacts::new("com.example.Plugin", UnitKind::Interface),
        UnitFacts::new("com.example.NamedPlugin", UnitKind::Interface)
            .implements("com.example.Plugin"),
        UnitFacts::new("com.example.BasePlugin", UnitKind::Standard)
            .implements("com.example.NamedPlugin"),
        UnitFacts::new("com.example.impl.FastPlugin", UnitKind::Standard)
            .extends("com.example.BasePlugin")
            .with_field_type("com.example.Settings"),
        UnitFacts::new("com.example.internal.HiddenPlugin", UnitKind::Standard)
            .extends("com.example.BasePlugin"),
        UnitFacts::new("com.example.Managed", UnitKind::Metadata),
        UnitFacts::new("com.example.Settings", UnitKind::Standard)
            .with_metadata("com.example.Managed")
            .with_constant("TIMEOUT", ConstantValue::Int(30))
            .with_constant("NAME", ConstantValue::String("demo".to_owned()))
            .with_constant("DEBUG", ConstantValue::Boolean(false)),
    ]
}
