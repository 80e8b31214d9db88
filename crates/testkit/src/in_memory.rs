//! In-memory doubles for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests
//! - Deterministic contract tests for the ports layer

use scanspec_ports::{
    LogEvent, LogFields, LogLevel, LoggerPort, ResourceOpenerPort, ScannedResource,
    SymbolResolverPort,
};
use scanspec_shared::{ErrorCode, ErrorEnvelope, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }

    fn is_enabled(&self, _level: LogLevel) -> bool {
        false
    }
}

/// Logger that keeps every event; children share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
    base_fields: LogFields,
}

impl RecordingLogger {
    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Recorded event names, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|event| event.event.to_string())
            .collect()
    }

    /// Recorded events with the given name.
    pub fn events_named(&self, name: &str) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|event| &*event.event == name)
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: LogEvent) {
        if !self.base_fields.is_empty() {
            let mut fields = self.base_fields.clone();
            fields.extend(event.fields.take().unwrap_or_default());
            event.fields = Some(fields);
        }
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base_fields,
        })
    }
}

/// Resolver returning the name itself, failing for a configured set.
#[derive(Debug, Default)]
pub struct RecordingResolver {
    failing: BTreeSet<String>,
    resolved: Mutex<Vec<String>>,
}

impl RecordingResolver {
    /// Resolver that fails for each name in `failing`.
    pub fn failing_for<I, S>(failing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: failing.into_iter().map(Into::into).collect(),
            resolved: Mutex::new(Vec::new()),
        }
    }

    /// Names resolved so far, including failed attempts.
    pub fn resolved(&self) -> Vec<String> {
        self.resolved
            .lock()
            .map(|names| names.clone())
            .unwrap_or_default()
    }
}

impl SymbolResolverPort for RecordingResolver {
    type Handle = String;

    fn resolve(&self, name: &str) -> Result<String> {
        if let Ok(mut names) = self.resolved.lock() {
            names.push(name.to_owned());
        }
        if self.failing.contains(name) {
            return Err(ErrorEnvelope::expected(
                ErrorCode::not_found(),
                format!("{name} is not loadable"),
            )
            .with_metadata("unit", name));
        }
        Ok(name.to_owned())
    }
}

/// Resource opener serving bytes from memory, keyed by `(container, path)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceOpener {
    files: BTreeMap<(String, String), Vec<u8>>,
}

impl MemoryResourceOpener {
    /// Add one file.
    #[must_use]
    pub fn with_file(mut self, container: &str, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files
            .insert((container.to_owned(), path.to_owned()), bytes.into());
        self
    }

    /// Describe a stored file with its true length.
    pub fn resource(&self, container: &str, path: &str) -> ScannedResource {
        let length = self
            .files
            .get(&(container.to_owned(), path.to_owned()))
            .map_or(0, |bytes| bytes.len() as u64);
        ScannedResource::new(container, path, length)
    }
}

impl ResourceOpenerPort for MemoryResourceOpener {
    fn open(&self, resource: &ScannedResource) -> Result<Box<dyn Read + Send>> {
        let key = (resource.container.to_string(), resource.relative_path.to_string());
        let bytes = self.files.get(&key).cloned().ok_or_else(|| {
            ErrorEnvelope::expected(ErrorCode::not_found(), "no such resource")
                .with_metadata("path", key.1.clone())
        })?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}
