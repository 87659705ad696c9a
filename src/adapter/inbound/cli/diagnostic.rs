//! Miette-based diagnostics for CLI error presentation.
//!
//! Converts controller errors into reports with a stable code and a help
//! line pointing at what the operator should look at next.

use miette::Diagnostic;
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::UnitLogs;
use crate::error::{ConfigError as SettingsError, Error, StartStage};

/// Failed `start`, annotated with the stage and backend log paths.
#[derive(Debug, Error, Diagnostic)]
#[error("start failed at stage {stage}: {message}")]
#[diagnostic(code(modelctl::start))]
pub struct StartFailure {
    pub stage: StartStage,
    pub message: String,
    #[help]
    pub help: Option<String>,
}

impl StartFailure {
    #[must_use]
    pub fn new(stage: StartStage, message: impl Into<String>, logs: &[UnitLogs]) -> Self {
        Self {
            stage,
            message: message.into(),
            help: start_help(stage, logs),
        }
    }
}

fn start_help(stage: StartStage, logs: &[UnitLogs]) -> Option<String> {
    let mut lines: Vec<String> = match stage {
        StartStage::Lock => vec!["another modelctl invocation holds this instance".into()],
        StartStage::Health | StartStage::Registry => {
            vec!["the instance was left running; `modelctl stop` tears it down".into()]
        }
        StartStage::Launch if !logs.is_empty() => {
            vec!["units launched before the failure were left running".into()]
        }
        _ => Vec::new(),
    };
    for log in logs {
        if let Some(path) = &log.log_err {
            lines.push(format!("{} stderr: {path}", log.unit));
        }
        if let Some(path) = &log.log_out {
            lines.push(format!("{} stdout: {path}", log.unit));
        }
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Settings problem with a pointer to where the value comes from.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(modelctl::config))]
pub struct ConfigError {
    pub message: String,
    #[help]
    pub help: Option<String>,
}

impl ConfigError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
        }
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

fn field_help(field: &str) -> Option<&'static str> {
    match field {
        "registry.url" => Some("set --registry-url, MODELCTL_REGISTRY_URL, or pass --no-sync"),
        "runtime.image" => Some("set --image, MODELCTL_IMAGE, or runtime.image in config.toml"),
        "runtime.adapter_image" => {
            Some("set --adapter-image, MODELCTL_ADAPTER_IMAGE, or runtime.adapter_image")
        }
        _ => None,
    }
}

/// Render a controller error as a miette report.
#[must_use]
pub fn report(err: Error) -> miette::Report {
    match err {
        Error::Start {
            stage,
            logs,
            source,
        } => StartFailure::new(stage, source.to_string(), &logs).into(),
        Error::Config(config) => {
            let help = match &config {
                SettingsError::MissingField { field } | SettingsError::InvalidValue { field, .. } => {
                    field_help(field)
                }
                _ => None,
            };
            let diagnostic = ConfigError::new(config.to_string());
            match help {
                Some(help) => diagnostic.with_help(help).into(),
                None => diagnostic.into(),
            }
        }
        other => miette::Report::msg(other.to_string()),
    }
}

/// Machine-readable error payload for `--json` mode.
///
/// A failed `start` carries its stage and the backend log locations.
#[must_use]
pub fn json_payload(err: &Error) -> Value {
    match err {
        Error::Start {
            stage,
            logs,
            source,
        } => json!({
            "message": err.to_string(),
            "stage": stage.as_str(),
            "cause": source.to_string(),
            "logs": logs,
        }),
        other => json!({ "message": other.to_string() }),
    }
}
