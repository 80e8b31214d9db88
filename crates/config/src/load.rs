//! Config loading helpers (file + env).
//!
//! Precedence (highest wins): env overrides, config file, defaults.

use crate::env::{ScanEnv, apply_env_overrides};
use crate::schema::{ScanConfig, ValidatedScanConfig};
use scanspec_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Parse and validate a JSON config document.
pub fn parse_scan_config_json(input: &str) -> Result<ValidatedScanConfig, ErrorEnvelope> {
    parse_config_unvalidated(input, ConfigFormat::Json)?
        .validate_and_normalize()
        .map_err(Into::into)
}

/// Parse and validate a TOML config document.
pub fn parse_scan_config_toml(input: &str) -> Result<ValidatedScanConfig, ErrorEnvelope> {
    parse_config_unvalidated(input, ConfigFormat::Toml)?
        .validate_and_normalize()
        .map_err(Into::into)
}

/// Load the scan config from an optional file path and explicit env overrides.
pub fn load_scan_config_from_path(
    config_path: Option<&Path>,
    env: &ScanEnv,
) -> Result<ValidatedScanConfig, ErrorEnvelope> {
    let config = match config_path {
        None => ScanConfig::default(),
        Some(path) => {
            let format = detect_config_format(path)?;
            let text = read_config_file(path)?;
            parse_config_unvalidated(&text, format)?
        },
    };

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the scan config from std env and an optional file path.
pub fn load_scan_config_std_env(
    config_path: Option<&Path>,
) -> Result<ValidatedScanConfig, ErrorEnvelope> {
    let env = ScanEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_scan_config_from_path(config_path, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &ScanConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as pretty TOML.
pub fn to_pretty_toml(config: &ScanConfig) -> Result<String, ErrorEnvelope> {
    toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })
}

fn parse_config_unvalidated(input: &str, format: ConfigFormat) -> Result<ScanConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
        }),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_owned())),
    }
}
