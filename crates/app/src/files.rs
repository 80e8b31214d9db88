//! Generic file matchers.
//!
//! A file matcher pairs a path test with one of four callback shapes. Streams
//! are opened through [`ResourceOpenerPort`]; whole-content callbacks are
//! refused for resources above the configured ceiling.

use crate::registry::{MatcherId, SealedRegistry};
use regex::Regex;
use scanspec_ports::{LogLevel, LoggerPort, ResourceOpenerPort, ScannedResource, log_fields};
use scanspec_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::io::Read;

/// How a discovered file is selected.
#[derive(Debug, Clone)]
pub enum FilePathTest {
    /// Full match of the relative path against a regular expression.
    Regex(Regex),
    /// Exact relative path.
    RelativePath(String),
    /// Exact final path segment.
    PathLeaf(String),
    /// Case-insensitive extension, stored lower-case without the dot.
    Extension(String),
}

impl FilePathTest {
    /// Compile a regex test anchored at both ends.
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(&format!("^(?:{pattern})$"))
            .map(Self::Regex)
            .map_err(|error| {
                ErrorEnvelope::expected(
                    ErrorCode::new("files", "invalid_regex"),
                    format!("invalid file path regex: {error}"),
                )
                .with_metadata("pattern", pattern)
            })
    }

    /// Select one exact relative path.
    pub fn relative_path(path: impl Into<String>) -> Self {
        Self::RelativePath(path.into())
    }

    /// Select files whose last segment equals `leaf`.
    ///
    /// A leaf given with directories is reduced to its last segment.
    pub fn path_leaf(leaf: &str) -> Self {
        Self::PathLeaf(last_segment(leaf).to_owned())
    }

    /// Select files by extension, with or without the leading dot.
    pub fn extension(extension: &str) -> Self {
        Self::Extension(extension.trim_start_matches('.').to_ascii_lowercase())
    }

    /// Whether the relative path passes the test.
    #[must_use]
    pub fn matches(&self, relative_path: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(relative_path),
            Self::RelativePath(path) => relative_path == path,
            Self::PathLeaf(leaf) => last_segment(relative_path) == leaf,
            Self::Extension(extension) => {
                let lower = relative_path.to_ascii_lowercase();
                lower
                    .strip_suffix(extension.as_str())
                    .is_some_and(|stem| stem.ends_with('.'))
            },
        }
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Stream callback: `(relative path, stream, length)`.
pub type StreamCallback = Box<dyn Fn(&str, &mut dyn Read, u64) -> Result<()> + Send + Sync>;
/// Stream callback with container: `(container, relative path, stream, length)`.
pub type ContainerStreamCallback =
    Box<dyn Fn(&str, &str, &mut dyn Read, u64) -> Result<()> + Send + Sync>;
/// Contents callback: `(relative path, bytes)`.
pub type ContentsCallback = Box<dyn Fn(&str, &[u8]) -> Result<()> + Send + Sync>;
/// Contents callback with container: `(container, relative path, bytes)`.
pub type ContainerContentsCallback = Box<dyn Fn(&str, &str, &[u8]) -> Result<()> + Send + Sync>;

/// The four callback shapes a file matcher can use.
pub enum FileMatchCallback {
    /// Receives an open stream.
    Stream(StreamCallback),
    /// Receives the container identifier and an open stream.
    StreamWithContainer(ContainerStreamCallback),
    /// Receives the whole content.
    Contents(ContentsCallback),
    /// Receives the container identifier and the whole content.
    ContentsWithContainer(ContainerContentsCallback),
}

impl FileMatchCallback {
    /// Wrap a stream callback.
    pub fn stream<F>(callback: F) -> Self
    where
        F: Fn(&str, &mut dyn Read, u64) -> Result<()> + Send + Sync + 'static,
    {
        Self::Stream(Box::new(callback))
    }

    /// Wrap a stream callback that also wants the container.
    pub fn stream_with_container<F>(callback: F) -> Self
    where
        F: Fn(&str, &str, &mut dyn Read, u64) -> Result<()> + Send + Sync + 'static,
    {
        Self::StreamWithContainer(Box::new(callback))
    }

    /// Wrap a whole-content callback.
    pub fn contents<F>(callback: F) -> Self
    where
        F: Fn(&str, &[u8]) -> Result<()> + Send + Sync + 'static,
    {
        Self::Contents(Box::new(callback))
    }

    /// Wrap a whole-content callback that also wants the container.
    pub fn contents_with_container<F>(callback: F) -> Self
    where
        F: Fn(&str, &str, &[u8]) -> Result<()> + Send + Sync + 'static,
    {
        Self::ContentsWithContainer(Box::new(callback))
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Stream(_) => "stream",
            Self::StreamWithContainer(_) => "stream_with_container",
            Self::Contents(_) => "contents",
            Self::ContentsWithContainer(_) => "contents_with_container",
        }
    }
}

impl fmt::Debug for FileMatchCallback {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// A registered file matcher.
#[derive(Debug)]
pub struct FileMatcher {
    pub(crate) id: MatcherId,
    pub(crate) test: FilePathTest,
    pub(crate) callback: FileMatchCallback,
}

/// One file matcher that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMatchFailure {
    /// Matcher that failed.
    pub matcher: MatcherId,
    /// Relative path of the resource.
    pub relative_path: String,
    /// Cause.
    pub error: ErrorEnvelope,
}

/// Outcome of offering one resource to every file matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMatchReport {
    /// Matchers whose test accepted the path.
    pub matched: usize,
    /// Callbacks that returned `Ok`.
    pub invoked: usize,
    /// Matchers that failed.
    pub failures: Vec<FileMatchFailure>,
}

fn content_too_large(resource: &ScannedResource, limit: u64) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::new("files", "content_too_large"),
        format!(
            "resource is {} bytes, above the {limit} byte whole-content limit",
            resource.length
        ),
    )
    .with_metadata("path", &*resource.relative_path)
    .with_metadata("length", resource.length.to_string())
}

fn io_failure(resource: &ScannedResource, error: &std::io::Error) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("files", "io"),
        format!("failed to read resource: {error}"),
        ErrorClass::NonRetriable,
    )
    .with_metadata("path", &*resource.relative_path)
}

/// Read exactly `resource.length` bytes, refusing oversized resources.
fn read_contents(resource: &ScannedResource, stream: &mut dyn Read, limit: u64) -> Result<Vec<u8>> {
    if resource.length > limit {
        return Err(content_too_large(resource, limit));
    }
    let capacity = usize::try_from(resource.length).map_err(|_| content_too_large(resource, limit))?;
    let mut buffer = Vec::with_capacity(capacity);
    stream
        .take(resource.length)
        .read_to_end(&mut buffer)
        .map_err(|error| io_failure(resource, &error))?;
    if buffer.len() < capacity {
        return Err(ErrorEnvelope::unexpected(
            ErrorCode::new("files", "short_read"),
            format!(
                "resource ended after {} of {} declared bytes",
                buffer.len(),
                resource.length
            ),
            ErrorClass::NonRetriable,
        )
        .with_metadata("path", &*resource.relative_path));
    }
    Ok(buffer)
}

impl FileMatcher {
    fn invoke(
        &self,
        resource: &ScannedResource,
        opener: &dyn ResourceOpenerPort,
        limit: u64,
    ) -> Result<()> {
        let container = &*resource.container;
        let path = &*resource.relative_path;
        let mut stream = opener.open(resource)?;
        match &self.callback {
            FileMatchCallback::Stream(callback) => callback(path, &mut stream, resource.length),
            FileMatchCallback::StreamWithContainer(callback) => {
                callback(container, path, &mut stream, resource.length)
            },
            FileMatchCallback::Contents(callback) => {
                let contents = read_contents(resource, &mut stream, limit)?;
                callback(path, &contents)
            },
            FileMatchCallback::ContentsWithContainer(callback) => {
                let contents = read_contents(resource, &mut stream, limit)?;
                callback(container, path, &contents)
            },
        }
    }
}

impl<H> SealedRegistry<H> {
    /// Whether any file matcher accepts the path.
    #[must_use]
    pub fn wants_file(&self, relative_path: &str) -> bool {
        self.file_matchers
            .iter()
            .any(|matcher| matcher.test.matches(relative_path))
    }

    /// Offer one discovered resource to every file matcher.
    ///
    /// Each accepting matcher opens its own stream. A failing matcher is
    /// reported and does not stop the others.
    pub fn process_file(
        &self,
        resource: &ScannedResource,
        opener: &dyn ResourceOpenerPort,
        logger: Option<&dyn LoggerPort>,
    ) -> FileMatchReport {
        let mut report = FileMatchReport::default();
        for matcher in &self.file_matchers {
            if !matcher.test.matches(&resource.relative_path) {
                continue;
            }
            report.matched += 1;
            if let Some(logger) = logger.filter(|logger| logger.is_enabled(LogLevel::Debug)) {
                logger.debug(
                    "files.matched",
                    "File matcher accepted resource",
                    Some(log_fields([
                        ("matcher", Value::from(matcher.id.index())),
                        ("container", Value::from(&*resource.container)),
                        ("path", Value::from(&*resource.relative_path)),
                        ("callback", Value::from(matcher.callback.label())),
                    ])),
                );
            }
            match matcher.invoke(resource, opener, self.max_content_bytes) {
                Ok(()) => report.invoked += 1,
                Err(error) => {
                    if let Some(logger) = logger {
                        logger.warn_with_error(
                            "files.failure",
                            "File matcher failed",
                            Some(log_fields([
                                ("matcher", Value::from(matcher.id.index())),
                                ("path", Value::from(&*resource.relative_path)),
                            ])),
                            error.clone(),
                        );
                    }
                    report.failures.push(FileMatchFailure {
                        matcher: matcher.id,
                        relative_path: resource.relative_path.to_string(),
                        error,
                    });
                },
            }
        }
        report
    }
}
