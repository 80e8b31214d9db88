//! End-to-end dispatch over the in-memory graph adapter.

use scanspec_adapters::{GraphBackedResolver, InMemoryUnitGraph, ResolvedUnit};
use scanspec_app::{
    CompileSpecDeps, DispatchDeps, FailureStage, FileMatchCallback, FilePathTest, MatcherRegistry,
    compile_spec, resolve_requested_unit,
};
use scanspec_domain::{ConstantValue, ScanSpecBuilder, UnitFacts, UnitKind, constants_of};
use scanspec_ports::LoggerPort;
use scanspec_shared::{ErrorCode, ErrorEnvelope, Result};
use scanspec_testkit::fixtures::sample_facts;
use scanspec_testkit::in_memory::{MemoryResourceOpener, RecordingLogger};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct Harness {
    registry: MatcherRegistry<ResolvedUnit>,
    deps: DispatchDeps<ResolvedUnit>,
    logger: RecordingLogger,
}

fn harness(tokens: &[&str]) -> Result<Harness> {
    harness_over(tokens, sample_facts())
}

fn harness_over(tokens: &[&str], facts: Vec<UnitFacts>) -> Result<Harness> {
    let logger = RecordingLogger::default();
    let shared_logger: Arc<dyn LoggerPort> = Arc::new(logger.clone());
    let spec = compile_spec(
        &CompileSpecDeps {
            logger: Some(Arc::clone(&shared_logger)),
        },
        ScanSpecBuilder::new().tokens(tokens.iter().copied()),
    );
    let graph = Arc::new(InMemoryUnitGraph::from_facts(facts)?);
    Ok(Harness {
        registry: MatcherRegistry::new(spec, 1024),
        deps: DispatchDeps {
            graph: graph.clone(),
            resolver: Arc::new(GraphBackedResolver::new(graph)),
            logger: Some(shared_logger),
        },
        logger,
    })
}

fn snapshot<T: Clone>(seen: &Arc<Mutex<Vec<T>>>) -> Vec<T> {
    seen.lock().map(|seen| seen.clone()).unwrap_or_default()
}

fn collector() -> (
    Arc<Mutex<Vec<String>>>,
    impl Fn(&ResolvedUnit) -> Result<()> + Send + Sync + 'static,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |unit: &ResolvedUnit| -> Result<()> {
        if let Ok(mut seen) = sink.lock() {
            seen.push(unit.name.clone());
        }
        Ok(())
    })
}

#[test]
fn implementors_exclude_blacklisted_namespace() -> Result<()> {
    let harness = harness(&["com.example", "-com.example.internal"])?;
    let (seen, callback) = collector();
    harness
        .registry
        .match_implementors_of("com.example.Plugin", callback)?;

    let report = harness
        .registry
        .seal()?
        .run_all(&harness.deps, &constants_of(&sample_facts()));

    assert!(report.is_clean());
    assert_eq!(
        snapshot(&seen),
        vec![
            "com.example.BasePlugin".to_owned(),
            "com.example.impl.FastPlugin".to_owned()
        ]
    );
    assert_eq!(harness.logger.events_named("dispatch.completed").len(), 1);
    Ok(())
}

#[test]
fn one_failing_name_does_not_stop_later_matchers() -> Result<()> {
    let harness = harness(&["com.example"])?;
    harness.registry.match_subclasses_of("com.example.BasePlugin", |unit| {
        if unit.name.ends_with("FastPlugin") {
            return Err(ErrorEnvelope::expected(ErrorCode::invalid_input(), "rejected"));
        }
        Ok(())
    })?;
    let (seen, callback) = collector();
    harness
        .registry
        .match_with_metadata("com.example.Managed", callback)?;

    let report = harness
        .registry
        .seal()?
        .run_all(&harness.deps, &constants_of(&sample_facts()));

    assert_eq!(report.callbacks_invoked, 2);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures.first(),
        Some(failure) if failure.stage == FailureStage::Callback
    ));
    assert_eq!(snapshot(&seen), vec!["com.example.Settings".to_owned()]);
    assert_eq!(harness.logger.events_named("dispatch.failure").len(), 1);
    Ok(())
}

#[test]
fn always_failing_callback_is_logged_per_name_and_later_matchers_finish() -> Result<()> {
    let facts = vec![
        UnitFacts::new("a.A", UnitKind::Standard),
        UnitFacts::new("a.B", UnitKind::Standard),
        UnitFacts::new("java.lang.X", UnitKind::Standard),
    ];
    let harness = harness_over(&[], facts.clone())?;
    let raising_calls = Arc::new(AtomicUsize::new(0));
    let raising = Arc::clone(&raising_calls);
    harness.registry.match_all_units(move |_| {
        raising.fetch_add(1, Ordering::SeqCst);
        Err(ErrorEnvelope::expected(ErrorCode::invalid_input(), "always fails"))
    })?;
    let (seen, callback) = collector();
    harness.registry.match_standard_units(callback)?;

    let report = harness
        .registry
        .seal()?
        .run_all(&harness.deps, &constants_of(&facts));

    let raising_calls = raising_calls.load(Ordering::SeqCst);
    assert_eq!(raising_calls, 2);
    assert_eq!(report.failures.len(), raising_calls);
    assert!(
        report
            .failures
            .iter()
            .all(|failure| failure.stage == FailureStage::Callback)
    );
    assert_eq!(harness.logger.events_named("dispatch.failure").len(), raising_calls);
    assert_eq!(snapshot(&seen), vec!["a.A".to_owned(), "a.B".to_owned()]);
    assert_eq!(report.matchers_run, 2);
    Ok(())
}

#[test]
fn constant_fields_and_interface_kind_checks() -> Result<()> {
    let harness = harness(&["com.example"])?;
    let values = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&values);
    harness.registry.match_constant_fields(
        ["com.example.Settings.TIMEOUT", "com.example.Settings.NAME"],
        move |_, field, value| {
            if let Ok(mut values) = sink.lock() {
                values.push((field.to_owned(), value.clone()));
            }
            Ok(())
        },
    )?;
    harness
        .registry
        .match_subinterfaces_of("com.example.BasePlugin", |_| Ok(()))?;

    let report = harness
        .registry
        .seal()?
        .run_all(&harness.deps, &constants_of(&sample_facts()));

    assert_eq!(
        snapshot(&values),
        vec![
            ("NAME".to_owned(), ConstantValue::String("demo".to_owned())),
            ("TIMEOUT".to_owned(), ConstantValue::Int(30)),
        ]
    );
    assert_eq!(report.field_callbacks_invoked, 2);
    assert!(
        report
            .failures
            .iter()
            .any(|failure| failure.stage == FailureStage::TargetKind)
    );
    Ok(())
}

#[test]
fn file_matchers_run_during_the_scan() -> Result<()> {
    let harness = harness(&["com.example"])?;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    harness.registry.match_files(
        FilePathTest::regex(r"META-INF/services/.*")?,
        FileMatchCallback::contents(move |path, bytes| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(format!("{path}:{}", String::from_utf8_lossy(bytes).trim()));
            }
            Ok(())
        }),
    )?;
    let sealed = harness.registry.seal()?;

    let opener = MemoryResourceOpener::default().with_file(
        "plugins.jar",
        "META-INF/services/com.example.Plugin",
        "com.example.impl.FastPlugin\n",
    );
    let resource = opener.resource("plugins.jar", "META-INF/services/com.example.Plugin");
    let report = sealed.process_file(&resource, &opener, Some(&harness.logger));
    assert_eq!(report.invoked, 1);
    assert_eq!(
        snapshot(&seen),
        vec!["META-INF/services/com.example.Plugin:com.example.impl.FastPlugin".to_owned()]
    );
    Ok(())
}

#[test]
fn direct_requests_are_fatal_when_excluded() -> Result<()> {
    let harness = harness(&["com.example", "-com.example.internal"])?;
    let spec = Arc::clone(harness.registry.spec());
    let resolver = harness.deps.resolver.as_ref();

    let unit = resolve_requested_unit(&spec, resolver, "com.example.Settings")?;
    assert_eq!(unit.kind, UnitKind::Standard);

    let hidden = resolve_requested_unit(&spec, resolver, "com.example.internal.HiddenPlugin").err();
    assert!(matches!(hidden, Some(ref error) if error.has_code("spec", "blacklisted_unit")));

    let unknown = resolve_requested_unit(&spec, resolver, "com.example.Nope").err();
    assert!(matches!(unknown, Some(ref error) if error.has_code("resolve", "failed")));
    Ok(())
}
