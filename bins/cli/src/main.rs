//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{
    QueryInput, QueryKind, Session, run_check_archive, run_check_unit, run_classify, run_compile,
    run_config_check, run_config_show, run_query,
};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use scanspec_config::LogLevelSetting;
use scanspec_shared::ErrorEnvelope;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "scanspec",
    version,
    about = "Scan-scope filtering and deferred match dispatch",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    /// Optional config file path (JSON/TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimum log level (overrides config and env).
    #[arg(long, global = true, value_parser = parse_log_level)]
    log_level: Option<LogLevelSetting>,

    /// Spec token; repeat to replace the configured tokens.
    #[arg(long = "spec", global = true, allow_hyphen_values = true)]
    spec_tokens: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile spec tokens and print the normalized rule sets.
    Compile {
        /// Spec tokens; when present they replace the configured tokens.
        #[arg(allow_hyphen_values = true)]
        tokens: Vec<String>,
    },
    /// Classify relative paths; a trailing `/` marks a directory.
    Classify {
        /// Relative paths to classify.
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Check dotted unit names against the spec.
    CheckUnit {
        /// Dotted unit names.
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Check archive leaf names against the spec.
    CheckArchive {
        /// Archive leaf names.
        #[arg(required = true)]
        leaves: Vec<String>,
    },
    /// Load unit facts, register one matcher, and run dispatch.
    Query {
        /// Unit facts file (JSON array).
        #[arg(long)]
        facts: PathBuf,
        /// Matcher kind.
        #[arg(long, value_enum)]
        kind: QueryKind,
        /// Query target; repeat for `constant-fields`.
        #[arg(long = "target")]
        targets: Vec<String>,
    },
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate the effective config.
    Check,
    /// Print the effective config.
    Show,
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

impl CliOutput {
    pub(crate) const fn ok(stdout: String) -> Self {
        Self {
            stdout,
            stderr: String::new(),
            exit_code: ExitCode::Ok,
        }
    }

    pub(crate) const fn with_exit_code(mut self, exit_code: ExitCode) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub(crate) fn with_stderr(mut self, stderr: String) -> Self {
        self.stderr = stderr;
        self
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    match run(&cli, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn parse_log_level(value: &str) -> Result<LogLevelSetting, String> {
    LogLevelSetting::parse(value)
        .ok_or_else(|| format!("unknown log level `{value}`; use debug, info, warn, or error"))
}

fn run(cli: &Cli, mode: OutputMode) -> Result<CliOutput, CliError> {
    let session = match Session::load(cli.config.as_deref(), cli.log_level, mode.log_format) {
        Ok(session) => session,
        Err(error) => return Ok(format_error_output(mode, &error)),
    };
    let result = match &cli.command {
        Commands::Compile { tokens } => {
            let tokens = if tokens.is_empty() {
                &cli.spec_tokens
            } else {
                tokens
            };
            run_compile(&session, tokens, mode)
        },
        Commands::Classify { paths } => run_classify(&session, &cli.spec_tokens, paths, mode),
        Commands::CheckUnit { names } => run_check_unit(&session, &cli.spec_tokens, names, mode),
        Commands::CheckArchive { leaves } => {
            run_check_archive(&session, &cli.spec_tokens, leaves, mode)
        },
        Commands::Query {
            facts,
            kind,
            targets,
        } => run_query(
            &session,
            &QueryInput {
                spec_tokens: &cli.spec_tokens,
                facts_path: facts,
                kind: *kind,
                targets,
            },
            mode,
        ),
        Commands::Config { command } => match command {
            ConfigCommands::Check => run_config_check(&session, cli.config.as_deref(), mode),
            ConfigCommands::Show => run_config_show(&session, mode),
        },
    };
    match result {
        Ok(output) => Ok(output),
        Err(commands::CommandError::Envelope(error)) => Ok(format_error_output(mode, &error)),
        Err(commands::CommandError::Cli(error)) => Err(error),
    }
}

pub(crate) fn format_error_output(mode: OutputMode, error: &ErrorEnvelope) -> CliOutput {
    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": error,
        });
        // This is a CLI boundary, so JSON serialization errors are internal.
        let mut output = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"code\":{\"namespace\":\"core\",\"code\":\"internal\"}}}"
                .to_owned()
        });
        output.push('\n');
        output
    } else {
        format!("status: error\ncode: {}\nmessage: {}\n", error.code, error.message)
    };

    CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::for_error(error),
    }
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;
    stdout.flush()?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{LogFormat, OutputFormat};
    use clap::CommandFactory;
    use scanspec_shared::ErrorCode;

    fn text_mode() -> OutputMode {
        OutputMode {
            format: OutputFormat::Text,
            log_format: LogFormat::Off,
        }
    }

    fn json_mode() -> OutputMode {
        OutputMode {
            format: OutputFormat::Json,
            log_format: LogFormat::Off,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn hyphenated_tokens_parse_as_values() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["scanspec", "compile", "com.foo", "-com.foo.bar", "!"])?;
        assert!(matches!(
            cli.command,
            Commands::Compile { ref tokens } if tokens == &["com.foo", "-com.foo.bar", "!"]
        ));
        Ok(())
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let parsed = Cli::try_parse_from(["scanspec", "--log-level", "loud", "config", "check"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn expected_errors_exit_with_invalid_input() {
        let error = ErrorEnvelope::expected(ErrorCode::new("config", "invalid_json"), "bad");
        let output = format_error_output(text_mode(), &error);
        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        assert!(output.stdout.starts_with("status: error\n"));
        assert!(output.stdout.contains("config:invalid_json"));
    }

    #[test]
    fn json_error_output_carries_the_envelope() -> Result<(), serde_json::Error> {
        let error = ErrorEnvelope::invariant(ErrorCode::internal(), "broken");
        let output = format_error_output(json_mode(), &error);
        assert_eq!(output.exit_code, ExitCode::Internal);
        let value: serde_json::Value = serde_json::from_str(&output.stdout)?;
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["code"]["namespace"], "core");
        Ok(())
    }

    #[test]
    fn missing_config_file_reports_error_status() -> Result<(), CliError> {
        let cli = Cli::try_parse_from([
            "scanspec",
            "--config",
            "/definitely/missing/scanspec.json",
            "--log-format",
            "off",
            "config",
            "check",
        ])
        .map_err(|error| CliError::InvalidInput(error.to_string()))?;
        let output = run(&cli, OutputMode::from_args(&cli.output))?;
        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        assert!(output.stdout.contains("config:config_file_not_found"));
        Ok(())
    }
}
