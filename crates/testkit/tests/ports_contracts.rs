//! Contract-style tests for port traits using in-memory doubles.

use scanspec_domain::{UnitFacts, UnitKind};
use scanspec_ports::{LogLevel, LoggerPort, ResourceOpenerPort, SymbolResolverPort};
use scanspec_testkit::fixtures::{fixture_text, sample_facts};
use scanspec_testkit::in_memory::{MemoryResourceOpener, NoopLogger, RecordingLogger, RecordingResolver};
use std::io::Read;

#[test]
fn noop_logger_reports_disabled() {
    let logger = NoopLogger;
    assert!(!logger.is_enabled(LogLevel::Error));
    logger.error("x.y", "ignored", None);
}

#[test]
fn recording_logger_keeps_order_and_errors() {
    let logger = RecordingLogger::default();
    logger.warn_with_error(
        "dispatch.failure",
        "failed",
        None,
        scanspec_testkit::errors::callback_error("nope"),
    );
    let failures = logger.events_named("dispatch.failure");
    assert_eq!(failures.len(), 1);
    assert!(failures[0].error.is_some());
}

#[test]
fn resolver_and_opener_contracts() {
    let resolver = RecordingResolver::default();
    assert_eq!(resolver.resolve("a.B").unwrap(), "a.B");

    let opener = MemoryResourceOpener::default().with_file("dir", "x/y.txt", b"abc".to_vec());
    let mut bytes = Vec::new();
    opener
        .open(&opener.resource("dir", "x/y.txt"))
        .unwrap()
        .read_to_end(&mut bytes)
        .unwrap();
    assert_eq!(bytes, b"abc");
}

#[test]
fn sample_facts_fixture_matches_builder() {
    let parsed: Vec<UnitFacts> =
        serde_json::from_str(&fixture_text("facts/sample-units.json")).unwrap();
    assert_eq!(parsed, sample_facts());
    assert!(
        parsed
            .iter()
            .any(|unit| unit.kind == UnitKind::Metadata)
    );
}
