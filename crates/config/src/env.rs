//! Environment variable parsing and merging.
//!
//! Env values win over file and default values. Parsing reads from a plain
//! key/value map so tests never touch the process environment.

use crate::schema::{LogLevelSetting, ScanConfig, ValidatedScanConfig};
use scanspec_domain::tokens_from_text;
use scanspec_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::fmt;

/// Spec tokens as whitespace/comma separated text.
pub const ENV_TOKENS: &str = "SCANSPEC_TOKENS";
/// Whether non-public fields are matched.
pub const ENV_IGNORE_FIELD_VISIBILITY: &str = "SCANSPEC_IGNORE_FIELD_VISIBILITY";
/// Whole-content read ceiling in bytes.
pub const ENV_MAX_CONTENT_BYTES: &str = "SCANSPEC_MAX_CONTENT_BYTES";
/// Minimum log level.
pub const ENV_LOG_LEVEL: &str = "SCANSPEC_LOG_LEVEL";

const ALL_ENV_VARS: [&str; 4] = [
    ENV_TOKENS,
    ENV_IGNORE_FIELD_VISIBILITY,
    ENV_MAX_CONTENT_BYTES,
    ENV_LOG_LEVEL,
];

/// Parsed env overrides; `None` leaves the config value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanEnv {
    /// Replacement spec tokens.
    pub tokens: Option<Vec<String>>,
    /// Field visibility override.
    pub ignore_field_visibility: Option<bool>,
    /// Content ceiling override.
    pub max_content_bytes: Option<u64>,
    /// Log level override.
    pub log_level: Option<LogLevelSetting>,
}

impl ScanEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            tokens: parse_optional_tokens(map, ENV_TOKENS)?,
            ignore_field_visibility: parse_optional_bool(map, ENV_IGNORE_FIELD_VISIBILITY)?,
            max_content_bytes: parse_optional_u64(map, ENV_MAX_CONTENT_BYTES)?,
            log_level: parse_optional_level(map, ENV_LOG_LEVEL)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let map = ALL_ENV_VARS
            .iter()
            .filter_map(|name| {
                std::env::var(name)
                    .ok()
                    .map(|value| ((*name).to_owned(), value))
            })
            .collect();
        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: ScanConfig,
    env: &ScanEnv,
) -> Result<ValidatedScanConfig, ErrorEnvelope> {
    let mut config = base;
    if let Some(tokens) = &env.tokens {
        config.spec.tokens.clone_from(tokens);
    }
    if let Some(ignore) = env.ignore_field_visibility {
        config.spec.ignore_field_visibility = ignore;
    }
    if let Some(limit) = env.max_content_bytes {
        config.dispatch.max_content_bytes = limit;
    }
    if let Some(level) = env.log_level {
        config.logging.level = level;
    }

    config.validate_and_normalize().map_err(Into::into)
}

fn trimmed<'a>(
    map: &'a BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<&'a str>, EnvParseError> {
    match map.get(var).map(|value| value.trim()) {
        None => Ok(None),
        Some("") => Err(EnvParseError::EmptyValue { var }),
        Some(value) => Ok(Some(value)),
    }
}

fn parse_optional_tokens(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Vec<String>>, EnvParseError> {
    Ok(trimmed(map, var)?.map(tokens_from_text))
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some(value) = trimmed(map, var)? else {
        return Ok(None);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: value.to_owned(),
        }),
    }
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    trimmed(map, var)?
        .map(|value| {
            value.replace('_', "").parse::<u64>().map_err(|_| EnvParseError::InvalidInt {
                var,
                value: value.to_owned(),
            })
        })
        .transpose()
}

fn parse_optional_level(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<LogLevelSetting>, EnvParseError> {
    trimmed(map, var)?
        .map(|value| {
            LogLevelSetting::parse(value).ok_or_else(|| EnvParseError::InvalidEnum {
                var,
                value: value.to_owned(),
            })
        })
        .transpose()
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Boolean env var had an invalid value.
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "env_empty_value"),
            Self::InvalidBool { .. } => ErrorCode::new("config", "env_invalid_bool"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "env_invalid_int"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "env_invalid_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must not be empty"),
            Self::InvalidBool { var, value } => {
                write!(formatter, "{var} must be a boolean (got `{value}`)")
            },
            Self::InvalidInt { var, value } => {
                write!(formatter, "{var} must be a non-negative integer (got `{value}`)")
            },
            Self::InvalidEnum { var, value } => write!(
                formatter,
                "{var} must be one of debug, info, warn, error (got `{value}`)"
            ),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            EnvParseError::EmptyValue { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidBool { var, value }
            | EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidEnum { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn empty_map_has_no_overrides() -> Result<(), EnvParseError> {
        assert_eq!(ScanEnv::from_map(&BTreeMap::new())?, ScanEnv::default());
        Ok(())
    }

    #[test]
    fn parses_all_overrides() -> Result<(), EnvParseError> {
        let env = ScanEnv::from_map(&env_map(&[
            (ENV_TOKENS, "com.foo, -com.foo.Secret"),
            (ENV_IGNORE_FIELD_VISIBILITY, "yes"),
            (ENV_MAX_CONTENT_BYTES, "1_048_576"),
            (ENV_LOG_LEVEL, "DEBUG"),
        ]))?;
        assert_eq!(
            env.tokens,
            Some(vec!["com.foo".to_owned(), "-com.foo.Secret".to_owned()])
        );
        assert_eq!(env.ignore_field_visibility, Some(true));
        assert_eq!(env.max_content_bytes, Some(1_048_576));
        assert_eq!(env.log_level, Some(LogLevelSetting::Debug));
        Ok(())
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            ScanEnv::from_map(&env_map(&[(ENV_MAX_CONTENT_BYTES, "lots")])),
            Err(EnvParseError::InvalidInt { .. })
        ));
        assert!(matches!(
            ScanEnv::from_map(&env_map(&[(ENV_IGNORE_FIELD_VISIBILITY, "maybe")])),
            Err(EnvParseError::InvalidBool { .. })
        ));
        assert!(matches!(
            ScanEnv::from_map(&env_map(&[(ENV_TOKENS, "  ")])),
            Err(EnvParseError::EmptyValue { var: ENV_TOKENS })
        ));
    }

    #[test]
    fn env_wins_and_result_is_validated() -> Result<(), ErrorEnvelope> {
        let mut base = ScanConfig::default();
        base.spec.tokens = vec!["org.file".to_owned()];
        let env = ScanEnv {
            tokens: Some(vec!["com.env".to_owned()]),
            ..ScanEnv::default()
        };
        let config = apply_env_overrides(base, &env)?;
        assert_eq!(config.as_ref().spec.tokens, vec!["com.env"]);

        let bad = ScanEnv {
            max_content_bytes: Some(0),
            ..ScanEnv::default()
        };
        assert!(apply_env_overrides(ScanConfig::default(), &bad).is_err());
        Ok(())
    }
}
