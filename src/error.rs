use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::UnitLogs;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("failed to parse model descriptor {}: {source}", path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors reported by the container runtime backend.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("failed to launch {unit}: {diagnostics}")]
    Launch { unit: String, diagnostics: String },

    #[error("failed to stop {unit}: {diagnostics}")]
    Stop { unit: String, diagnostics: String },

    #[error("runtime command `{operation}` failed: {reason}")]
    Command { operation: String, reason: String },

    #[error("failed to parse runtime listing: {0}")]
    Listing(#[source] serde_json::Error),
}

/// Errors returned by the model registry service.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry {operation} returned {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("registry {operation} failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid registry url: {0}")]
    Url(#[from] url::ParseError),
}

/// Stage of `start` at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStage {
    Lock,
    StopExisting,
    Allocate,
    Launch,
    Health,
    Registry,
}

impl StartStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::StopExisting => "stop-existing",
            Self::Allocate => "allocate",
            Self::Launch => "launch",
            Self::Health => "health",
            Self::Registry => "registry",
        }
    }
}

impl fmt::Display for StartStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("no free port in range {low}-{high}")]
    PortExhausted { low: u16, high: u16 },

    #[error(
        "instance not ready after {}s ({attempts} attempts); still waiting on: {}",
        elapsed.as_secs(),
        pending.join(", ")
    )]
    HealthTimeout {
        attempts: u32,
        elapsed: Duration,
        pending: Vec<String>,
    },

    #[error("registry sync for model '{model}' failed: {reason}")]
    RegistrySync { model: String, reason: String },

    #[error("failed to stop {} unit(s): {}", failures.len(), failures.join("; "))]
    Stop { failures: Vec<String> },

    #[error("failed to build {purpose} HTTP client: {source}")]
    HttpClient {
        purpose: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("instance '{id}' is locked by another invocation")]
    Busy { id: String },

    #[error("start failed at stage {stage}: {source}")]
    Start {
        stage: StartStage,
        logs: Vec<UnitLogs>,
        #[source]
        source: Box<Error>,
    },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap this error with the `start` stage it occurred in.
    #[must_use]
    pub fn at_stage(self, stage: StartStage, logs: Vec<UnitLogs>) -> Self {
        Self::Start {
            stage,
            logs,
            source: Box::new(self),
        }
    }

    /// Backend log locations attached to a failed `start`, if any.
    #[must_use]
    pub fn logs(&self) -> &[UnitLogs] {
        match self {
            Self::Start { logs, .. } => logs,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_exhausted_names_range() {
        let err = Error::PortExhausted {
            low: 50000,
            high: 50010,
        };
        assert_eq!(err.to_string(), "no free port in range 50000-50010");
    }

    #[test]
    fn start_error_carries_stage_and_logs() {
        let logs = vec![UnitLogs {
            unit: "m1__server".into(),
            log_out: Some("/tmp/out".into()),
            log_err: Some("/tmp/err".into()),
        }];
        let err = Error::HealthTimeout {
            attempts: 3,
            elapsed: Duration::from_secs(6),
            pending: vec!["http://127.0.0.1:1/health".into()],
        }
        .at_stage(StartStage::Health, logs);

        assert!(err.to_string().starts_with("start failed at stage health"));
        assert_eq!(err.logs().len(), 1);
        assert_eq!(err.logs()[0].unit, "m1__server");
    }

    #[test]
    fn stop_error_lists_failures() {
        let err = Error::Stop {
            failures: vec!["a: boom".into(), "b: bang".into()],
        };
        assert_eq!(err.to_string(), "failed to stop 2 unit(s): a: boom; b: bang");
    }
}
