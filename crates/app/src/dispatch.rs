//! Run recorded matchers against the completed unit graph.

use crate::registry::{MatcherId, SealedRegistry, UnitMatcher, UnitQuery};
use scanspec_domain::{ConstantValue, ScanSpec, UnitConstants, UnitKind};
use scanspec_ports::{LogLevel, LoggerPort, SymbolResolverPort, UnitGraphPort, log_fields};
use scanspec_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

/// Collaborators needed at dispatch time.
pub struct DispatchDeps<H> {
    /// Completed relationship graph.
    pub graph: Arc<dyn UnitGraphPort>,
    /// Resolves matched names to callback handles.
    pub resolver: Arc<dyn SymbolResolverPort<Handle = H>>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

impl<H> Clone for DispatchDeps<H> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            resolver: Arc::clone(&self.resolver),
            logger: self.logger.clone(),
        }
    }
}

/// Where a per-name failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The query target has the wrong kind; the matcher was skipped.
    TargetKind,
    /// The matched name could not be resolved.
    Resolve,
    /// The callback returned an error.
    Callback,
    /// The callback panicked.
    Panic,
}

impl FailureStage {
    /// Stable identifier for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TargetKind => "target_kind",
            Self::Resolve => "resolve",
            Self::Callback => "callback",
            Self::Panic => "panic",
        }
    }
}

/// One failure recorded during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchFailure {
    /// Matcher that failed.
    pub matcher: MatcherId,
    /// Query label, or `constant_fields`.
    pub query: &'static str,
    /// Failure stage.
    pub stage: FailureStage,
    /// Matched unit, if the failure concerns one name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Field, for constant-field callbacks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Cause.
    pub error: ErrorEnvelope,
}

/// Totals and failures from one dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    /// Unit matchers whose query was run.
    pub matchers_run: usize,
    /// Names handed to unit callbacks (after filtering).
    pub units_matched: usize,
    /// Unit callbacks that returned `Ok`.
    pub callbacks_invoked: usize,
    /// Field callbacks that returned `Ok`.
    pub field_callbacks_invoked: usize,
    /// Per-name failures, in dispatch order.
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    /// True when nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn run_query(graph: &dyn UnitGraphPort, query: &UnitQuery) -> BTreeSet<String> {
    match query {
        UnitQuery::AllUnits => graph.all_unit_names(),
        UnitQuery::StandardUnits => graph.unit_names_of_kind(UnitKind::Standard),
        UnitQuery::InterfaceUnits => graph.unit_names_of_kind(UnitKind::Interface),
        UnitQuery::MetadataUnits => graph.unit_names_of_kind(UnitKind::Metadata),
        UnitQuery::SubclassesOf(target) => graph.subclasses_of(target),
        UnitQuery::SubinterfacesOf(target) => graph.subinterfaces_of(target),
        UnitQuery::ImplementorsOf(target) => graph.implementors_of(target),
        UnitQuery::WithFieldOfType(target) => graph.units_with_field_of_type(target),
        UnitQuery::WithMetadata(target) => graph.units_with_metadata(target),
    }
}

/// Names the query returns that the spec still admits.
#[must_use]
pub fn filtered_query(spec: &ScanSpec, graph: &dyn UnitGraphPort, query: &UnitQuery) -> Vec<String> {
    run_query(graph, query)
        .into_iter()
        .filter(|name| spec.unit_allowed(name))
        .collect()
}

fn check_target_kind(graph: &dyn UnitGraphPort, query: &UnitQuery) -> Result<()> {
    let (Some(target), Some(expected)) = (query.target(), query.expected_target_kind()) else {
        return Ok(());
    };
    match graph.unit_kind(target) {
        Some(actual) if actual != expected => Err(ErrorEnvelope::expected(
            ErrorCode::new("dispatch", "target_kind_mismatch"),
            format!("{target} is a {actual} unit, but {} needs a {expected} unit", query.label()),
        )
        .with_metadata("unit", target)
        .with_metadata("expected", expected.as_str())
        .with_metadata("actual", actual.as_str())),
        _ => Ok(()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "callback panicked".to_owned())
}

/// Run a callback, turning a panic into an error envelope.
fn guarded<F>(callback: F) -> std::result::Result<(), (FailureStage, ErrorEnvelope)>
where
    F: FnOnce() -> Result<()>,
{
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err((
            FailureStage::Callback,
            ErrorEnvelope::expected(
                ErrorCode::new("dispatch", "callback_failed"),
                format!("match callback failed: {}", error.message),
            )
            .with_metadata("cause", error.code.to_string()),
        )),
        Err(payload) => Err((
            FailureStage::Panic,
            ErrorEnvelope::unexpected(
                ErrorCode::new("dispatch", "callback_panicked"),
                format!("match callback panicked: {}", panic_message(payload.as_ref())),
                ErrorClass::NonRetriable,
            ),
        )),
    }
}

struct Dispatcher<'a, H> {
    deps: &'a DispatchDeps<H>,
    report: DispatchReport,
}

impl<H> Dispatcher<'_, H> {
    fn logger(&self) -> Option<&dyn LoggerPort> {
        self.deps.logger.as_deref()
    }

    fn record(&mut self, failure: DispatchFailure) {
        if let Some(logger) = self.logger() {
            let mut fields = log_fields([
                ("matcher", Value::from(failure.matcher.index())),
                ("query", Value::from(failure.query)),
                ("stage", Value::from(failure.stage.as_str())),
            ]);
            if let Some(unit) = &failure.unit {
                fields.insert("unit".into(), Value::from(unit.as_str()));
            }
            if let Some(field) = &failure.field {
                fields.insert("field".into(), Value::from(field.as_str()));
            }
            logger.warn_with_error(
                "dispatch.failure",
                "Match processing failed",
                Some(fields),
                failure.error.clone(),
            );
        }
        self.report.failures.push(failure);
    }

    fn run_unit_matcher(&mut self, spec: &ScanSpec, matcher: &UnitMatcher<H>) {
        let query = matcher.query();
        let label = query.label();
        if let Err(error) = check_target_kind(self.deps.graph.as_ref(), query) {
            self.record(DispatchFailure {
                matcher: matcher.id(),
                query: label,
                stage: FailureStage::TargetKind,
                unit: query.target().map(str::to_owned),
                field: None,
                error,
            });
            return;
        }

        self.report.matchers_run += 1;
        for name in filtered_query(spec, self.deps.graph.as_ref(), query) {
            self.report.units_matched += 1;
            if let Some(logger) = self
                .logger()
                .filter(|logger| logger.is_enabled(LogLevel::Debug))
            {
                logger.debug(
                    "dispatch.matched",
                    "Unit matched",
                    Some(log_fields([
                        ("matcher", Value::from(matcher.id().index())),
                        ("query", Value::from(label)),
                        ("unit", Value::from(name.as_str())),
                    ])),
                );
            }

            let handle = match self.deps.resolver.resolve(&name) {
                Ok(handle) => handle,
                Err(error) => {
                    self.record(DispatchFailure {
                        matcher: matcher.id(),
                        query: label,
                        stage: FailureStage::Resolve,
                        unit: Some(name),
                        field: None,
                        error,
                    });
                    continue;
                },
            };

            match guarded(|| (matcher.callback)(&handle)) {
                Ok(()) => self.report.callbacks_invoked += 1,
                Err((stage, error)) => self.record(DispatchFailure {
                    matcher: matcher.id(),
                    query: label,
                    stage,
                    unit: Some(name),
                    field: None,
                    error,
                }),
            }
        }
    }

    fn run_field_callbacks(&mut self, registry: &SealedRegistry<H>, constants: &UnitConstants) {
        let index = registry.field_index();
        if index.is_empty() {
            return;
        }
        for (unit, fields) in constants {
            for (field, value) in fields {
                for (id, callback) in index.callbacks_for(unit, field) {
                    self.run_field_callback(*id, unit, field, value, callback.as_ref());
                }
            }
        }
    }

    fn run_field_callback(
        &mut self,
        id: MatcherId,
        unit: &str,
        field: &str,
        value: &ConstantValue,
        callback: &(dyn Fn(&str, &str, &ConstantValue) -> Result<()> + Send + Sync),
    ) {
        if let Some(logger) = self
            .logger()
            .filter(|logger| logger.is_enabled(LogLevel::Debug))
        {
            logger.debug(
                "dispatch.field_matched",
                "Constant field matched",
                Some(log_fields([
                    ("matcher", Value::from(id.index())),
                    ("unit", Value::from(unit)),
                    ("field", Value::from(field)),
                    ("value", Value::from(value.to_string())),
                ])),
            );
        }
        match guarded(|| callback(unit, field, value)) {
            Ok(()) => self.report.field_callbacks_invoked += 1,
            Err((stage, error)) => self.record(DispatchFailure {
                matcher: id,
                query: "constant_fields",
                stage,
                unit: Some(unit.to_owned()),
                field: Some(field.to_owned()),
                error,
            }),
        }
    }
}

impl<H> SealedRegistry<H> {
    /// Run every unit matcher in registration order, then every field
    /// callback, and consume the registry.
    ///
    /// Failures are isolated per matched name: a failing resolve or callback
    /// is recorded and the remaining names and matchers still run.
    pub fn run_all(self, deps: &DispatchDeps<H>, constants: &UnitConstants) -> DispatchReport {
        let started_at = Instant::now();
        let mut dispatcher = Dispatcher {
            deps,
            report: DispatchReport::default(),
        };
        for matcher in &self.unit_matchers {
            dispatcher.run_unit_matcher(&self.spec, matcher);
        }
        dispatcher.run_field_callbacks(&self, constants);

        let report = dispatcher.report;
        if let Some(logger) = deps.logger.as_deref() {
            logger.info(
                "dispatch.completed",
                "Match dispatch completed",
                Some(log_fields([
                    ("matchersRun", Value::from(report.matchers_run)),
                    ("unitsMatched", Value::from(report.units_matched)),
                    ("callbacksInvoked", Value::from(report.callbacks_invoked)),
                    (
                        "fieldCallbacksInvoked",
                        Value::from(report.field_callbacks_invoked),
                    ),
                    ("failures", Value::from(report.failures.len())),
                    ("durationMs", Value::from(duration_ms(started_at))),
                ])),
            );
        }
        report
    }
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}
