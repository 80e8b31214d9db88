//! Integration tests for parsing config fixtures from the workspace testkit.

use scanspec_config::{
    CURRENT_CONFIG_VERSION, LogLevelSetting, ScanEnv, load_scan_config_from_path,
    parse_scan_config_json, parse_scan_config_toml,
};
use scanspec_shared::ErrorCode;
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
        .join("crates")
        .join("testkit")
        .join("fixtures")
        .join("config")
}

fn read_fixture(name: &str) -> Result<String, Box<dyn Error>> {
    Ok(fs::read_to_string(fixtures_dir().join(name))?)
}

#[test]
fn parses_valid_json_fixture() -> Result<(), Box<dyn Error>> {
    let config = parse_scan_config_json(&read_fixture("scan-config.valid.json")?)?;

    assert_eq!(config.as_ref().version, CURRENT_CONFIG_VERSION);
    assert_eq!(
        config.as_ref().spec.tokens,
        vec!["com.example", "-com.example.internal", "archive:app-*.jar"],
        "tokens should be trimmed"
    );
    assert_eq!(config.max_content_bytes(), 16_777_216);
    assert_eq!(config.log_level(), LogLevelSetting::Debug);

    let spec = config.spec_builder().build();
    assert!(spec.whitelisted_path_prefixes().contains("com/example/"));
    assert!(spec.archive_allowed("app-core.jar"));
    Ok(())
}

#[test]
fn toml_fixture_matches_json_fixture() -> Result<(), Box<dyn Error>> {
    let json = parse_scan_config_json(&read_fixture("scan-config.valid.json")?)?;
    let toml = parse_scan_config_toml(&read_fixture("scan-config.valid.toml")?)?;

    assert_eq!(json, toml);
    Ok(())
}

#[test]
fn invalid_fixture_reports_limit_code() -> Result<(), Box<dyn Error>> {
    let error = parse_scan_config_json(&read_fixture("scan-config.invalid.json")?)
        .err()
        .ok_or("invalid fixture should fail")?;

    assert_eq!(error.code, ErrorCode::new("config", "limit_out_of_range"));
    assert_eq!(
        error.metadata.get("field").map(String::as_str),
        Some("maxContentBytes")
    );
    Ok(())
}

#[test]
fn env_map_overrides_file_values() -> Result<(), Box<dyn Error>> {
    let map: BTreeMap<String, String> = [
        ("SCANSPEC_TOKENS", "org.other"),
        ("SCANSPEC_LOG_LEVEL", "error"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect();
    let env = ScanEnv::from_map(&map)?;
    let config =
        load_scan_config_from_path(Some(fixtures_dir().join("scan-config.valid.toml").as_path()), &env)?;

    assert_eq!(config.as_ref().spec.tokens, vec!["org.other"]);
    assert_eq!(config.log_level(), LogLevelSetting::Error);
    assert_eq!(config.max_content_bytes(), 16_777_216);
    Ok(())
}
