pub mod doctor;
pub mod migrate;
pub mod seed;

use monthbook_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use tokio::runtime::Runtime;

/// Failure from one step of a command: error class for the JSON envelope,
/// human-readable message, process exit code.
pub(crate) type StepFailure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'a str,
    error_class: Option<&'a str>,
    message: &'a str,
}

impl CommandResult {
    pub fn success(command: &'static str, message: impl Into<String>) -> Self {
        Self::render(command, None, message.into(), 0)
    }

    pub fn failure(
        command: &'static str,
        error_class: &'static str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::render(command, Some(error_class), message.into(), exit_code)
    }

    // A class is carried exactly when the command failed, so status follows it.
    fn render(
        command: &'static str,
        error_class: Option<&'static str>,
        message: String,
        exit_code: u8,
    ) -> Self {
        let status = if error_class.is_none() { "ok" } else { "error" };
        let outcome = CommandOutcome { command, status, error_class, message: &message };
        let output = serde_json::to_string(&outcome).unwrap_or_else(|error| {
            format!(
                "{{\"command\":\"{command}\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        Self { exit_code, output }
    }
}

/// Shared prologue of every command that touches the database: load and
/// validate configuration, then build a current-thread runtime.
pub(crate) fn prepare(command: &'static str) -> Result<(AppConfig, Runtime), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    Ok((config, runtime))
}

pub(crate) fn finish(
    command: &'static str,
    outcome: Result<String, StepFailure>,
) -> CommandResult {
    match outcome {
        Ok(message) => CommandResult::success(command, message),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

pub(crate) fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
