//! Apptainer instance backend.
//!
//! Drives the `apptainer` CLI: `instance start`, `instance list --json`,
//! `instance stop` and `shell`. Argument vectors are built by pure
//! functions so they can be checked without the binary installed.
//!
//! Container environment is handed over as `APPTAINERENV_*` variables on
//! the child process. Argv never carries env values.

use std::process::{Output, Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::{LaunchSpec, Mount, ShellSpec, UnitInfo};
use crate::error::{Result, RuntimeError};
use crate::port::outbound::runtime::Runtime;

/// Default executable name.
pub const DEFAULT_BINARY: &str = "apptainer";

/// [`Runtime`] backed by Apptainer instances.
#[derive(Debug, Clone)]
pub struct Apptainer {
    binary: String,
}

impl Apptainer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn output(
        &self,
        operation: &str,
        args: &[String],
        env: &[(String, String)],
    ) -> Result<Output> {
        debug!(
            binary = %self.binary,
            args = ?args,
            env = ?env_keys(env),
            "Running runtime command"
        );
        let output = Command::new(&self.binary)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RuntimeError::Command {
                operation: operation.to_string(),
                reason: format!("could not execute {}: {e}", self.binary),
            })?;
        Ok(output)
    }
}

impl Default for Apptainer {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

/// Prefix Apptainer strips when copying host variables into the container.
pub const ENV_PREFIX: &str = "APPTAINERENV_";

/// `--nv` and `--bind` flags shared by `instance start` and `shell`.
fn isolation_args(gpu: bool, mounts: &[Mount]) -> Vec<String> {
    let mut args = Vec::new();
    if gpu {
        args.push("--nv".to_string());
    }
    for mount in mounts {
        args.push("--bind".to_string());
        args.push(mount.to_bind_arg());
    }
    args
}

pub(crate) fn start_args(spec: &LaunchSpec) -> Vec<String> {
    let mut args = vec!["instance".to_string(), "start".to_string()];
    args.extend(isolation_args(spec.gpu, &spec.mounts));
    args.push(spec.image.clone());
    args.push(spec.unit.clone());
    args.extend(spec.args.iter().cloned());
    args
}

pub(crate) fn stop_args(unit: &str) -> Vec<String> {
    vec!["instance".to_string(), "stop".to_string(), unit.to_string()]
}

pub(crate) fn list_args() -> Vec<String> {
    vec!["instance".to_string(), "list".to_string(), "--json".to_string()]
}

pub(crate) fn shell_args(spec: &ShellSpec) -> Vec<String> {
    let mut args = vec!["shell".to_string()];
    args.extend(isolation_args(spec.gpu, &spec.mounts));
    args.push(spec.image.clone());
    args
}

/// Child-process variables carrying `env` into the container.
pub(crate) fn container_env<'a>(
    env: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> Vec<(String, String)> {
    env.into_iter()
        .map(|(key, value)| (format!("{ENV_PREFIX}{key}"), value.clone()))
        .collect()
}

/// Variable names only, for logging.
fn env_keys(env: &[(String, String)]) -> Vec<&str> {
    env.iter().map(|(key, _)| key.as_str()).collect()
}

/// Captured stderr, falling back to stdout, for error reports.
fn diagnostics(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stdout
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    instances: Option<Vec<ListedInstance>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedInstance {
    instance: String,
    #[serde(default)]
    pid: Option<u32>,
    #[serde(default)]
    img: Option<String>,
    #[serde(default)]
    log_out_path: Option<String>,
    #[serde(default)]
    log_err_path: Option<String>,
}

impl From<ListedInstance> for UnitInfo {
    fn from(listed: ListedInstance) -> Self {
        let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());
        Self {
            name: listed.instance,
            pid: listed.pid,
            image: non_empty(listed.img),
            log_out: non_empty(listed.log_out_path),
            log_err: non_empty(listed.log_err_path),
        }
    }
}

/// Parse `instance list --json` output.
pub(crate) fn parse_listing(stdout: &str) -> Result<Vec<UnitInfo>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let listing: Listing = serde_json::from_str(stdout).map_err(RuntimeError::Listing)?;
    Ok(listing
        .instances
        .unwrap_or_default()
        .into_iter()
        .map(UnitInfo::from)
        .collect())
}

#[async_trait]
impl Runtime for Apptainer {
    async fn run(&self, spec: &LaunchSpec) -> Result<UnitInfo> {
        let output = self
            .output("instance start", &start_args(spec), &container_env(&spec.env))
            .await?;
        if !output.status.success() {
            return Err(RuntimeError::Launch {
                unit: spec.unit.clone(),
                diagnostics: diagnostics(&output),
            }
            .into());
        }
        info!(unit = %spec.unit, image = %spec.image, "Instance started");

        let launched = self
            .list()
            .await?
            .into_iter()
            .find(|info| info.name == spec.unit);
        Ok(launched.unwrap_or_else(|| UnitInfo {
            image: Some(spec.image.clone()),
            ..UnitInfo::named(&spec.unit)
        }))
    }

    async fn list(&self) -> Result<Vec<UnitInfo>> {
        let output = self.output("instance list", &list_args(), &[]).await?;
        if !output.status.success() {
            return Err(RuntimeError::Command {
                operation: "instance list".to_string(),
                reason: diagnostics(&output),
            }
            .into());
        }
        parse_listing(&String::from_utf8_lossy(&output.stdout))
    }

    async fn stop(&self, unit: &str) -> Result<()> {
        if !self.exists(unit).await? {
            debug!(unit, "Unit not present; nothing to stop");
            return Ok(());
        }
        let output = self.output("instance stop", &stop_args(unit), &[]).await?;
        if !output.status.success() {
            return Err(RuntimeError::Stop {
                unit: unit.to_string(),
                diagnostics: diagnostics(&output),
            }
            .into());
        }
        Ok(())
    }

    async fn shell(&self, spec: &ShellSpec) -> Result<i32> {
        let args = shell_args(spec);
        let env = container_env(&spec.env);
        debug!(
            binary = %self.binary,
            args = ?args,
            env = ?env_keys(&env),
            "Opening interactive shell"
        );
        let status = Command::new(&self.binary)
            .args(&args)
            .envs(env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| RuntimeError::Command {
                operation: "shell".to_string(),
                reason: format!("could not execute {}: {e}", self.binary),
            })?;
        // Killed by a signal: report a generic failure.
        Ok(status.code().unwrap_or(1))
    }
}
