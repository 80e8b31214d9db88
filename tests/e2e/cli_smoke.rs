//! CLI E2E smoke tests.

use scanspec_testkit::fixtures::fixture_path;
use std::io;
use std::process::{Command, Output};

fn run_cli(args: &[&str]) -> io::Result<Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_scanspec"));
    command.args(["--log-format", "off"]).args(args);
    for (key, _) in std::env::vars() {
        if key.starts_with("SCANSPEC_") {
            command.env_remove(key);
        }
    }
    command.output()
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn compile_output_is_deterministic() -> io::Result<()> {
    let args = ["--json", "compile", "com.example", "-com.example.internal"];
    let first = run_cli(&args)?;
    let second = run_cli(&args)?;
    assert_eq!(first.status.code(), Some(0));
    assert_eq!(stdout_of(&first), stdout_of(&second));
    Ok(())
}

#[test]
fn classify_prints_one_outcome_per_path() -> io::Result<()> {
    let output = run_cli(&[
        "--spec",
        "com.example",
        "classify",
        "com/",
        "com/example/impl/",
        "com/example/Settings.class",
    ])?;
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout_of(&output),
        "com/\tancestor_of_whitelisted\ncom/example/impl/\twithin_whitelisted\n\
         com/example/Settings.class\twhitelisted_file\n"
    );
    Ok(())
}

#[test]
fn query_lists_implementors_outside_blacklist() -> io::Result<()> {
    let facts = fixture_path("facts/sample-units.json");
    let facts = facts.to_string_lossy();
    let output = run_cli(&[
        "--spec",
        "com.example",
        "--spec",
        "-com.example.internal",
        "query",
        "--facts",
        &facts,
        "--kind",
        "implementors-of",
        "--target",
        "com.example.Plugin",
    ])?;
    assert_eq!(output.status.code(), Some(0));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("unit: com.example.impl.FastPlugin"));
    assert!(!stdout.contains("HiddenPlugin"));
    Ok(())
}

#[test]
fn missing_facts_file_exits_with_invalid_input() -> io::Result<()> {
    let output = run_cli(&[
        "query",
        "--facts",
        "/definitely/missing/facts.json",
        "--kind",
        "all-units",
    ])?;
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout_of(&output).contains("cli:facts_unreadable"));
    Ok(())
}

#[test]
fn invalid_config_exits_with_invalid_input() -> io::Result<()> {
    let config = fixture_path("config/scan-config.invalid.json");
    let config = config.to_string_lossy();
    let output = run_cli(&["--config", &config, "--json", "config", "check"])?;
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout_of(&output).contains("\"status\": \"error\""));
    Ok(())
}
