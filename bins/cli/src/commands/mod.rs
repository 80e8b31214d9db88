//! CLI command implementations.

mod config;
mod query;
mod spec;

pub use config::{run_config_check, run_config_show};
pub use query::{QueryInput, QueryKind, run_query};
pub use spec::{run_check_archive, run_check_unit, run_classify, run_compile};

use crate::error::CliError;
use crate::format::LogFormat;
use scanspec_adapters::{JsonLogger, StderrLogSink, TracingLogger};
use scanspec_app::{CompileSpecDeps, compile_spec};
use scanspec_config::{LogLevelSetting, ValidatedScanConfig, load_scan_config_std_env};
use scanspec_domain::{ScanSpec, ScanSpecBuilder};
use scanspec_ports::{LogLevel, LoggerPort};
use scanspec_shared::ErrorEnvelope;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Failure of a command: envelopes render as `status: error` output.
#[derive(Debug)]
pub enum CommandError {
    Envelope(ErrorEnvelope),
    Cli(CliError),
}

impl From<ErrorEnvelope> for CommandError {
    fn from(error: ErrorEnvelope) -> Self {
        Self::Envelope(error)
    }
}

impl From<CliError> for CommandError {
    fn from(error: CliError) -> Self {
        Self::Cli(error)
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(error: serde_json::Error) -> Self {
        Self::Cli(CliError::Serialization(error))
    }
}

/// Effective config plus the logger every command shares.
pub struct Session {
    pub config: ValidatedScanConfig,
    pub logger: Option<Arc<dyn LoggerPort>>,
}

impl Session {
    /// Load config (file, then env) and build the logger.
    pub fn load(
        config_path: Option<&Path>,
        log_level: Option<LogLevelSetting>,
        log_format: LogFormat,
    ) -> Result<Self, ErrorEnvelope> {
        let config = load_scan_config_std_env(config_path)?;
        let level = log_level.unwrap_or_else(|| config.log_level());
        Ok(Self {
            config,
            logger: build_logger(log_format, level),
        })
    }

    /// Compile the spec; non-empty `tokens` replace the configured ones.
    pub fn compile(&self, tokens: &[String]) -> Arc<ScanSpec> {
        let builder = if tokens.is_empty() {
            self.config.spec_builder()
        } else {
            ScanSpecBuilder::new()
                .tokens(tokens.iter().cloned())
                .ignore_field_visibility(self.config.as_ref().spec.ignore_field_visibility)
        };
        let deps = CompileSpecDeps {
            logger: self.logger.clone(),
        };
        compile_spec(&deps, builder)
    }
}

const fn to_log_level(level: LogLevelSetting) -> LogLevel {
    match level {
        LogLevelSetting::Debug => LogLevel::Debug,
        LogLevelSetting::Info => LogLevel::Info,
        LogLevelSetting::Warn => LogLevel::Warn,
        LogLevelSetting::Error => LogLevel::Error,
    }
}

fn build_logger(format: LogFormat, level: LogLevelSetting) -> Option<Arc<dyn LoggerPort>> {
    match format {
        LogFormat::Off => None,
        LogFormat::Json => Some(Arc::new(
            JsonLogger::new(Arc::new(StderrLogSink)).with_min_level(to_log_level(level)),
        )),
        LogFormat::Tracing => {
            let filter = tracing_subscriber::EnvFilter::new(format!("scanspec={}", level.as_str()));
            // A second init (tests) keeps the first subscriber.
            let _ = tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .try_init();
            Some(Arc::new(TracingLogger::new()))
        },
    }
}

pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, CommandError> {
    let mut output = serde_json::to_string_pretty(value)?;
    output.push('\n');
    Ok(output)
}
