//! Load unit facts, register one matcher, and run dispatch.

use super::{CommandError, Session, to_pretty_json};
use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use clap::ValueEnum;
use scanspec_adapters::{GraphBackedResolver, InMemoryUnitGraph, ResolvedUnit, parse_facts_json};
use scanspec_app::{DispatchDeps, DispatchReport, MatcherRegistry, UnitQuery};
use scanspec_domain::{ConstantValue, UnitConstants, constants_of};
use scanspec_ports::UnitGraphPort;
use scanspec_shared::{ErrorCode, ErrorEnvelope, Result, ResultExt};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Matcher kinds the `query` command can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryKind {
    AllUnits,
    StandardUnits,
    InterfaceUnits,
    MetadataUnits,
    SubclassesOf,
    SubinterfacesOf,
    ImplementorsOf,
    WithFieldOfType,
    WithMetadata,
    ConstantFields,
}

impl QueryKind {
    fn unit_query(self, target: Option<&str>) -> Result<UnitQuery, CliError> {
        let owned = || {
            target.map(str::to_owned).ok_or_else(|| {
                CliError::InvalidInput("this query kind needs exactly one --target".to_owned())
            })
        };
        Ok(match self {
            Self::AllUnits => UnitQuery::AllUnits,
            Self::StandardUnits => UnitQuery::StandardUnits,
            Self::InterfaceUnits => UnitQuery::InterfaceUnits,
            Self::MetadataUnits => UnitQuery::MetadataUnits,
            Self::SubclassesOf => UnitQuery::SubclassesOf(owned()?),
            Self::SubinterfacesOf => UnitQuery::SubinterfacesOf(owned()?),
            Self::ImplementorsOf => UnitQuery::ImplementorsOf(owned()?),
            Self::WithFieldOfType => UnitQuery::WithFieldOfType(owned()?),
            Self::WithMetadata => UnitQuery::WithMetadata(owned()?),
            Self::ConstantFields => {
                return Err(CliError::InvalidInput(
                    "constant-fields is not a unit query".to_owned(),
                ));
            },
        })
    }
}

/// Arguments of one `query` invocation.
pub struct QueryInput<'a> {
    pub spec_tokens: &'a [String],
    pub facts_path: &'a Path,
    pub kind: QueryKind,
    pub targets: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldValue {
    unit: String,
    field: String,
    value: ConstantValue,
}

#[derive(Default)]
struct Collected {
    units: Mutex<Vec<ResolvedUnit>>,
    fields: Mutex<Vec<FieldValue>>,
}

fn poisoned() -> ErrorEnvelope {
    ErrorEnvelope::invariant(ErrorCode::new("cli", "poisoned"), "result buffer lock poisoned")
}

fn read_facts(path: &Path) -> Result<(Arc<InMemoryUnitGraph>, UnitConstants), ErrorEnvelope> {
    let text = std::fs::read_to_string(path).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("cli", "facts_unreadable"),
            format!("failed to read unit facts: {error}"),
        )
        .with_metadata("path", path.to_string_lossy().to_string())
    })?;
    let source = path.to_string_lossy().to_string();
    let facts = parse_facts_json(&text).with_context("path", source.clone())?;
    let constants = constants_of(&facts);
    let graph = InMemoryUnitGraph::from_facts(facts).with_context("path", source)?;
    Ok((Arc::new(graph), constants))
}

/// Run the query and print matched units, field values, and the report.
///
/// Exits with 1 when dispatch recorded failures.
pub fn run_query(
    session: &Session,
    input: &QueryInput<'_>,
    mode: OutputMode,
) -> Result<CliOutput, CommandError> {
    let spec = session.compile(input.spec_tokens);
    let (graph, constants) = read_facts(input.facts_path)?;
    let registry: MatcherRegistry<ResolvedUnit> =
        MatcherRegistry::new(spec, session.config.max_content_bytes());
    let collected = Arc::new(Collected::default());

    if input.kind == QueryKind::ConstantFields {
        if input.targets.is_empty() {
            return Err(CliError::InvalidInput(
                "constant-fields needs at least one --target".to_owned(),
            )
            .into());
        }
        let sink = Arc::clone(&collected);
        registry.match_constant_fields(input.targets.iter(), move |unit, field, value| {
            sink.fields.lock().map_err(|_| poisoned())?.push(FieldValue {
                unit: unit.to_owned(),
                field: field.to_owned(),
                value: value.clone(),
            });
            Ok(())
        })?;
    } else {
        if input.targets.len() > 1 {
            return Err(
                CliError::InvalidInput("this query kind takes one --target".to_owned()).into(),
            );
        }
        let query = input.kind.unit_query(input.targets.first().map(String::as_str))?;
        let sink = Arc::clone(&collected);
        registry.register(
            query,
            Box::new(move |unit: &ResolvedUnit| -> Result<()> {
                sink.units.lock().map_err(|_| poisoned())?.push(unit.clone());
                Ok(())
            }),
        )?;
    }

    let graph_port: Arc<dyn UnitGraphPort> = graph.clone();
    let deps = DispatchDeps {
        graph: graph_port,
        resolver: Arc::new(GraphBackedResolver::new(graph)),
        logger: session.logger.clone(),
    };
    let report = registry.seal()?.run_all(&deps, &constants);

    let units = collected.units.lock().map_err(|_| poisoned())?.clone();
    let fields = collected.fields.lock().map_err(|_| poisoned())?.clone();
    let exit_code = if report.is_clean() {
        ExitCode::Ok
    } else {
        ExitCode::Internal
    };

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": if report.is_clean() { "ok" } else { "partial" },
            "units": units,
            "fields": fields,
            "report": report,
        });
        to_pretty_json(&payload)?
    } else {
        format_query_text(&units, &fields, &report)
    };
    let mut output = CliOutput::ok(stdout).with_exit_code(exit_code);
    if !report.is_clean() {
        output = output.with_stderr(format!(
            "warning: {} dispatch failure(s); see report\n",
            report.failures.len()
        ));
    }
    Ok(output)
}

fn format_query_text(units: &[ResolvedUnit], fields: &[FieldValue], report: &DispatchReport) -> String {
    let mut output = String::from(if report.is_clean() {
        "status: ok\n"
    } else {
        "status: partial\n"
    });
    for unit in units {
        let _ = writeln!(output, "unit: {} ({})", unit.name, unit.kind);
    }
    for field in fields {
        let _ = writeln!(output, "field: {}.{} = {}", field.unit, field.field, field.value);
    }
    let _ = writeln!(output, "matchersRun: {}", report.matchers_run);
    let _ = writeln!(output, "unitsMatched: {}", report.units_matched);
    let _ = writeln!(output, "callbacksInvoked: {}", report.callbacks_invoked);
    let _ = writeln!(output, "fieldCallbacksInvoked: {}", report.field_callbacks_invoked);
    for failure in &report.failures {
        let _ = writeln!(
            output,
            "failure: {} {} {} {}",
            failure.matcher,
            failure.stage.as_str(),
            failure.unit.as_deref().unwrap_or("-"),
            failure.error.code
        );
    }
    output
}
