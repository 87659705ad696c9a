//! Runtime units: the independently launchable processes behind a role.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A host path bound into the isolated environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

impl Mount {
    pub fn read_write(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    pub fn read_only(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: true,
        }
    }

    /// Render as a `SRC:DST[:ro]` bind argument.
    #[must_use]
    pub fn to_bind_arg(&self) -> String {
        let mut arg = format!("{}:{}", self.source.display(), self.target);
        if self.read_only {
            arg.push_str(":ro");
        }
        arg
    }
}

/// Everything the runtime needs to launch one named unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Unit name in the runtime's instance namespace.
    pub unit: String,
    /// Image reference.
    pub image: String,
    /// Environment injected into the unit.
    pub env: BTreeMap<String, String>,
    /// Host paths bound into the unit.
    pub mounts: Vec<Mount>,
    /// Arguments passed to the image's start script.
    pub args: Vec<String>,
    /// Expose host GPUs.
    pub gpu: bool,
}

/// Interactive session in the execution environment, untracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSpec {
    pub image: String,
    pub env: BTreeMap<String, String>,
    pub mounts: Vec<Mount>,
    pub gpu: bool,
}

/// One unit as enumerated by the runtime backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_err: Option<String>,
}

impl UnitInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pid: None,
            image: None,
            log_out: None,
            log_err: None,
        }
    }

    #[must_use]
    pub fn logs(&self) -> UnitLogs {
        UnitLogs {
            unit: self.name.clone(),
            log_out: self.log_out.clone(),
            log_err: self.log_err.clone(),
        }
    }
}

/// Backend-reported stdout/stderr locations of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLogs {
    pub unit: String,
    pub log_out: Option<String>,
    pub log_err: Option<String>,
}
