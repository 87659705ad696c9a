//! CLI integration tests.
//!
//! Every invocation points settings and state at a scratch directory and
//! clears the `MODELCTL_*` variables so the host's own setup cannot leak in.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "MODELCTL_IMAGE",
    "MODELCTL_ADAPTER_IMAGE",
    "MODELCTL_API_KEY",
    "MODELCTL_ADVERTISE_HOST",
    "MODELCTL_REGISTRY_URL",
    "MODELCTL_REGISTRY_TOKEN",
    "MODELCTL_DEVICES",
    "MODELCTL_CACHE_DIR",
];

fn modelctl(scratch: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("modelctl");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("MODELCTL_SETTINGS", scratch.join("config.toml"))
        .env("MODELCTL_STATE_DIR", scratch.join("state"))
        .env("RUST_LOG", "off");
    cmd
}

fn write_model(dir: &Path) -> PathBuf {
    let path = dir.join("demo.yaml");
    fs::write(&path, "model: demo\n").unwrap();
    path
}

#[test]
fn help_lists_subcommands() {
    let scratch = TempDir::new().unwrap();
    modelctl(scratch.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("modelctl"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("stop"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("shell"));
}

#[test]
fn version_is_printed() {
    let scratch = TempDir::new().unwrap();
    modelctl(scratch.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn list_help_mentions_table() {
    let scratch = TempDir::new().unwrap();
    modelctl(scratch.path())
        .args(["list", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--table"));
}

#[test]
fn start_requires_config_argument() {
    let scratch = TempDir::new().unwrap();
    modelctl(scratch.path()).arg("start").assert().failure();
}

#[test]
fn start_with_missing_config_fails() {
    let scratch = TempDir::new().unwrap();
    modelctl(scratch.path())
        .args(["start", "--no-sync"])
        .arg(scratch.path().join("absent.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.yaml"));
}

#[test]
fn start_without_registry_url_fails_before_launch() {
    let scratch = TempDir::new().unwrap();
    let config = write_model(scratch.path());
    modelctl(scratch.path())
        .args(["start", "--image", "/images/server.sif"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("registry.url"))
        .stderr(predicate::str::contains("--no-sync"));
}

#[test]
fn start_without_image_fails_with_hint() {
    let scratch = TempDir::new().unwrap();
    let config = write_model(scratch.path());
    modelctl(scratch.path())
        .args(["start", "--no-sync"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("runtime.image"))
        .stderr(predicate::str::contains("MODELCTL_IMAGE"));
}

#[test]
fn invalid_settings_file_is_reported() {
    let scratch = TempDir::new().unwrap();
    fs::write(scratch.path().join("config.toml"), "[ports]\nlow = 10\n").unwrap();
    modelctl(scratch.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ports.low"));
}

#[test]
fn json_mode_reports_errors_as_json() {
    let scratch = TempDir::new().unwrap();
    fs::write(scratch.path().join("config.toml"), "[ports]\nlow = 10\n").unwrap();
    modelctl(scratch.path())
        .args(["--json", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""type":"error""#));
}

#[test]
fn missing_runtime_binary_fails_list() {
    let scratch = TempDir::new().unwrap();
    fs::write(
        scratch.path().join("config.toml"),
        "[runtime]\nbinary = \"/nonexistent/apptainer\"\n",
    )
    .unwrap();
    modelctl(scratch.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("instance list"));
}

/// A runtime stand-in whose launches fail after leaving a unit behind.
#[cfg(unix)]
fn failing_runtime(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let marker = dir.join("started");
    let script = dir.join("apptainer");
    fs::write(
        &script,
        format!(
            r#"#!/bin/sh
if [ "$1 $2" = "instance start" ]; then
  touch "{marker}"
  echo "boom" >&2
  exit 1
fi
if [ -f "{marker}" ]; then
  echo '{{"instances":[{{"instance":"demo","pid":1,"img":"/img","logErrPath":"/logs/demo.err","logOutPath":"/logs/demo.out"}}]}}'
else
  echo '{{"instances":[]}}'
fi
"#,
            marker = marker.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[cfg(unix)]
#[test]
fn json_start_failure_carries_stage_and_log_paths() {
    let scratch = TempDir::new().unwrap();
    let runtime = failing_runtime(scratch.path());
    fs::write(
        scratch.path().join("config.toml"),
        format!("[runtime]\nbinary = \"{}\"\n", runtime.display()),
    )
    .unwrap();
    let config = write_model(scratch.path());

    modelctl(scratch.path())
        .args(["--json", "start", "--no-sync", "--image", "/img"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""stage":"launch""#))
        .stderr(predicate::str::contains("/logs/demo.err"))
        .stderr(predicate::str::contains("boom"));
}
