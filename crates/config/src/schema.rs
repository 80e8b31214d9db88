//! Scan configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Normalization trims spec tokens and drops blank ones.

use scanspec_domain::ScanSpecBuilder;
use scanspec_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Default ceiling for whole-content reads (the largest 32-bit signed length).
pub const DEFAULT_MAX_CONTENT_BYTES: u64 = 2_147_483_647;

const MAX_CONTENT_BYTES_MIN: u64 = 1;
const MAX_CONTENT_BYTES_MAX: u64 = 1 << 40;
const SPEC_TOKENS_MAX: usize = 4_096;

/// Top-level scan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ScanConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Scan spec tokens and options.
    pub spec: SpecConfig,
    /// Dispatch limits.
    pub dispatch: DispatchConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            spec: SpecConfig::default(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Scan spec section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SpecConfig {
    /// Raw spec tokens, e.g. `["com.example", "-com.example.internal"]`.
    pub tokens: Vec<String>,
    /// Index and match non-public fields too.
    pub ignore_field_visibility: bool,
}

/// Dispatch section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct DispatchConfig {
    /// Largest resource that may be read whole for a contents callback.
    pub max_content_bytes: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
        }
    }
}

/// Minimum level emitted by loggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevelSetting {
    /// Everything, including per-match events.
    Debug,
    /// Summaries and above.
    #[default]
    Info,
    /// Diagnostics and isolated failures.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevelSetting {
    /// Lower-case name, also usable as a tracing filter directive.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parse a level name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Minimum level.
    pub level: LogLevelSetting,
}

impl ScanConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedScanConfig, ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }

        self.spec.normalize();
        self.spec.validate()?;
        self.dispatch.validate()?;

        Ok(ValidatedScanConfig { raw: self })
    }
}

impl SpecConfig {
    fn normalize(&mut self) {
        self.tokens = self
            .tokens
            .iter()
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .collect();
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if self.tokens.len() > SPEC_TOKENS_MAX {
            return Err(ConfigSchemaError::ListTooLarge {
                section: "spec",
                field: "tokens",
                len: self.tokens.len(),
                max: SPEC_TOKENS_MAX,
            });
        }
        if let Some((index, token)) = self
            .tokens
            .iter()
            .enumerate()
            .find(|(_, token)| token.chars().any(char::is_whitespace))
        {
            return Err(ConfigSchemaError::InvalidToken {
                index,
                token: token.clone(),
            });
        }
        Ok(())
    }
}

impl DispatchConfig {
    const fn validate(&self) -> Result<(), ConfigSchemaError> {
        if self.max_content_bytes < MAX_CONTENT_BYTES_MIN
            || self.max_content_bytes > MAX_CONTENT_BYTES_MAX
        {
            return Err(ConfigSchemaError::LimitOutOfRange {
                section: "dispatch",
                field: "maxContentBytes",
                value: self.max_content_bytes,
                min: MAX_CONTENT_BYTES_MIN,
                max: MAX_CONTENT_BYTES_MAX,
            });
        }
        Ok(())
    }
}

/// Config that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedScanConfig {
    raw: ScanConfig,
}

impl ValidatedScanConfig {
    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &ScanConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> ScanConfig {
        self.raw
    }

    /// A spec builder preloaded with the configured tokens and options.
    #[must_use]
    pub fn spec_builder(&self) -> ScanSpecBuilder {
        ScanSpecBuilder::new()
            .tokens(self.raw.spec.tokens.iter().cloned())
            .ignore_field_visibility(self.raw.spec.ignore_field_visibility)
    }

    /// Whole-content read ceiling in bytes.
    #[must_use]
    pub const fn max_content_bytes(&self) -> u64 {
        self.raw.dispatch.max_content_bytes
    }

    /// Configured minimum log level.
    #[must_use]
    pub const fn log_level(&self) -> LogLevelSetting {
        self.raw.logging.level
    }
}

impl AsRef<ScanConfig> for ValidatedScanConfig {
    fn as_ref(&self) -> &ScanConfig {
        &self.raw
    }
}

/// Validation failures for [`ScanConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// Schema version is not supported.
    UnsupportedVersion {
        /// Version found in the input.
        found: u32,
        /// Version this build understands.
        supported: u32,
    },
    /// Numeric value is outside its allowed range.
    LimitOutOfRange {
        /// Config section.
        section: &'static str,
        /// Field name (camelCase).
        field: &'static str,
        /// Supplied value.
        value: u64,
        /// Inclusive minimum.
        min: u64,
        /// Inclusive maximum.
        max: u64,
    },
    /// List has too many entries.
    ListTooLarge {
        /// Config section.
        section: &'static str,
        /// Field name (camelCase).
        field: &'static str,
        /// Number of entries.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },
    /// A spec token contains whitespace.
    InvalidToken {
        /// Position in the token list.
        index: usize,
        /// Offending token.
        token: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "limit_out_of_range"),
            Self::ListTooLarge { .. } => ErrorCode::new("config", "list_too_large"),
            Self::InvalidToken { .. } => ErrorCode::new("config", "invalid_token"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                formatter,
                "unsupported config version: {found} (supported: {supported})"
            ),
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min}, {max}] (got {value})"
            ),
            Self::ListTooLarge {
                section,
                field,
                len,
                max,
            } => write!(
                formatter,
                "{section}.{field} has {len} entries (max {max})"
            ),
            Self::InvalidToken { index, token } => write!(
                formatter,
                "spec.tokens[{index}] must not contain whitespace (got `{token}`)"
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => envelope
                .with_metadata("found", found.to_string())
                .with_metadata("supported", supported.to_string()),
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value", value.to_string())
                .with_metadata("min", min.to_string())
                .with_metadata("max", max.to_string()),
            ConfigSchemaError::ListTooLarge {
                section,
                field,
                len,
                max,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("len", len.to_string())
                .with_metadata("max", max.to_string()),
            ConfigSchemaError::InvalidToken { index, token } => envelope
                .with_metadata("index", index.to_string())
                .with_metadata("token", token),
        }
    }
}
