//! Structured logging boundary contract.

use scanspec_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Log level, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

impl LogLevel {
    /// Lower-case name used in output and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

/// Additional event fields.
pub type LogFields = BTreeMap<Box<str>, serde_json::Value>;

/// Structured log event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Stable event name, e.g. `dispatch.failure`.
    pub event: Box<str>,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: Box<str>,
    /// Optional structured fields.
    pub fields: Option<LogFields>,
    /// Optional error payload.
    pub error: Option<ErrorEnvelope>,
}

impl LogEvent {
    /// Build an event without an error payload.
    pub fn new(
        level: LogLevel,
        event: &str,
        message: impl Into<Box<str>>,
        fields: Option<LogFields>,
    ) -> Self {
        Self {
            event: event.into(),
            level,
            message: message.into(),
            fields,
            error: None,
        }
    }

    /// Attach an error payload.
    #[must_use]
    pub fn with_error(mut self, error: ErrorEnvelope) -> Self {
        self.error = Some(error);
        self
    }
}

/// Boundary contract for structured logging.
///
/// Loggers are passed explicitly to every operation that reports; there is
/// no process-wide verbosity switch.
pub trait LoggerPort: Send + Sync {
    /// Emit a structured event.
    fn log(&self, event: LogEvent);

    /// Create a child logger with base fields applied to every event.
    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort>;

    /// Whether events at this level would be emitted.
    ///
    /// Callers use this to skip building expensive fields.
    fn is_enabled(&self, level: LogLevel) -> bool {
        let _ = level;
        true
    }

    /// Convenience: debug event.
    fn debug(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Debug, event, message, fields));
    }

    /// Convenience: info event.
    fn info(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Info, event, message, fields));
    }

    /// Convenience: warn event.
    fn warn(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Warn, event, message, fields));
    }

    /// Convenience: error event.
    fn error(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Error, event, message, fields));
    }

    /// Convenience: warn event carrying an error envelope.
    fn warn_with_error(
        &self,
        event: &str,
        message: &str,
        fields: Option<LogFields>,
        error: ErrorEnvelope,
    ) {
        self.log(LogEvent::new(LogLevel::Warn, event, message, fields).with_error(error));
    }
}

/// Build a field map from key/value pairs.
pub fn log_fields<const N: usize>(entries: [(&str, serde_json::Value); N]) -> LogFields {
    entries
        .into_iter()
        .map(|(key, value)| (Box::from(key), value))
        .collect()
}
