//! # scanspec-config
//!
//! Configuration schema, validation, and loading for the scanspec CLI.
//! This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file).
pub mod load;
/// Configuration schema types and validation.
pub mod schema;

pub use env::{
    ENV_IGNORE_FIELD_VISIBILITY, ENV_LOG_LEVEL, ENV_MAX_CONTENT_BYTES, ENV_TOKENS, EnvParseError,
    ScanEnv, apply_env_overrides,
};
pub use load::{
    load_scan_config_from_path, load_scan_config_std_env, parse_scan_config_json,
    parse_scan_config_toml, to_pretty_json, to_pretty_toml,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, DEFAULT_MAX_CONTENT_BYTES, DispatchConfig,
    LogLevelSetting, LoggingConfig, ScanConfig, SpecConfig, ValidatedScanConfig,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
