//! `config check` and `config show`.

use super::{CommandError, Session, to_pretty_json};
use crate::CliOutput;
use crate::format::OutputMode;
use scanspec_config::to_pretty_toml;
use std::path::Path;

/// Validate the effective config; loading already did the work.
pub fn run_config_check(
    session: &Session,
    path: Option<&Path>,
    mode: OutputMode,
) -> Result<CliOutput, CommandError> {
    if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": session.config.as_ref(),
        });
        return Ok(CliOutput::ok(to_pretty_json(&payload)?));
    }
    Ok(CliOutput::ok("status: ok\nconfig: ok\n".to_owned()))
}

/// Print the effective config as TOML (text) or JSON.
pub fn run_config_show(session: &Session, mode: OutputMode) -> Result<CliOutput, CommandError> {
    let config = session.config.as_ref();
    let stdout = if mode.is_json() {
        to_pretty_json(config)?
    } else {
        to_pretty_toml(config)?
    };
    Ok(CliOutput::ok(stdout))
}
