//! Logger adapter forwarding events to `tracing`.

use scanspec_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use serde_json::Value;

/// Forwards events to the installed `tracing` subscriber.
///
/// Structured fields and the error envelope are attached as JSON strings so
/// any subscriber format can render them.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: LogFields,
}

impl TracingLogger {
    /// Logger without base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn encode_fields(base: &LogFields, extra: Option<LogFields>) -> String {
    let mut merged = base.clone();
    if let Some(extra) = extra {
        merged.extend(extra);
    }
    if merged.is_empty() {
        return String::new();
    }
    let object: serde_json::Map<String, Value> = merged
        .into_iter()
        .map(|(key, value)| (key.into_string(), value))
        .collect();
    Value::Object(object).to_string()
}

impl LoggerPort for TracingLogger {
    fn log(&self, event: LogEvent) {
        let fields = encode_fields(&self.base_fields, event.fields);
        let error = event
            .error
            .map(|error| error.to_string())
            .unwrap_or_default();
        let name = &*event.event;
        let message = &*event.message;
        match event.level {
            LogLevel::Debug => {
                tracing::debug!(target: "scanspec", event = name, fields = fields.as_str(), error = error.as_str(), "{message}");
            },
            LogLevel::Info => {
                tracing::info!(target: "scanspec", event = name, fields = fields.as_str(), error = error.as_str(), "{message}");
            },
            LogLevel::Warn => {
                tracing::warn!(target: "scanspec", event = name, fields = fields.as_str(), error = error.as_str(), "{message}");
            },
            LogLevel::Error => {
                tracing::error!(target: "scanspec", event = name, fields = fields.as_str(), error = error.as_str(), "{message}");
            },
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self { base_fields })
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Debug => tracing::enabled!(target: "scanspec", tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(target: "scanspec", tracing::Level::INFO),
            LogLevel::Warn => tracing::enabled!(target: "scanspec", tracing::Level::WARN),
            LogLevel::Error => tracing::enabled!(target: "scanspec", tracing::Level::ERROR),
        }
    }
}
