//! Handler for the `stop` command.

use std::io;
use std::path::Path;

use serde_json::json;
use tracing::warn;

use crate::adapter::inbound::cli::command::StopArgs;
use crate::adapter::inbound::cli::output;
use crate::application::identity;
use crate::domain::InstanceDescriptor;
use crate::error::{ConfigError, Error, Result};
use crate::infrastructure::bootstrap::{self, RegistryMode};
use crate::infrastructure::config::settings::Settings;

/// Execute the stop command.
pub async fn execute(settings: &Settings, state_dir: &Path, args: &StopArgs) -> Result<i32> {
    let descriptor = descriptor_for_stop(&args.config)?;
    let lifecycle = bootstrap::build_lifecycle(settings, state_dir, RegistryMode::Disabled)?;

    let report = lifecycle.stop(&descriptor).await?;

    if output::is_json() {
        output::json_output(&json!({
            "command": "stop",
            "id": report.id,
            "was_running": report.was_running,
            "stopped": report.stopped,
        }));
        return Ok(0);
    }

    if report.was_running {
        output::success(&format!(
            "Stopped {} ({})",
            report.id,
            report.stopped.join(", ")
        ));
    } else {
        output::warning(&format!("{} is not running", report.id));
    }
    Ok(0)
}

/// Descriptor for `stop`; a deleted config file still identifies its instance.
fn descriptor_for_stop(path: &Path) -> Result<InstanceDescriptor> {
    match identity::resolve(path) {
        Err(Error::Config(ConfigError::ReadFile { source, .. }))
            if source.kind() == io::ErrorKind::NotFound =>
        {
            let id = identity::canonical_id(path)?;
            warn!(path = %path.display(), id = %id, "Config file missing; stopping by id");
            Ok(InstanceDescriptor::single(id, String::new()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_falls_back_to_id() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = descriptor_for_stop(&dir.path().join("llama-3.yaml")).unwrap();
        assert_eq!(descriptor.id.as_str(), "llama-3");
    }

    #[test]
    fn malformed_config_is_still_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "model: [unclosed").unwrap();
        assert!(descriptor_for_stop(&path).is_err());
    }
}
