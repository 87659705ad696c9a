//! Handler for the `start` command.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::command::StartArgs;
use crate::adapter::inbound::cli::output;
use crate::application::identity;
use crate::application::lifecycle::StartReport;
use crate::domain::SyncOutcome;
use crate::error::Result;
use crate::infrastructure::bootstrap::{self, RegistryMode};
use crate::infrastructure::config::settings::Settings;

/// Execute the start command.
pub async fn execute(settings: &Settings, state_dir: &Path, args: &StartArgs) -> Result<i32> {
    let descriptor = identity::resolve(&args.config)?;
    let mode = if args.no_sync {
        RegistryMode::Disabled
    } else {
        RegistryMode::Enabled
    };
    let lifecycle = bootstrap::build_lifecycle(settings, state_dir, mode)?;

    output::header(env!("CARGO_PKG_VERSION"));
    let pb = output::spinner(&format!(
        "Starting {} ({})",
        descriptor.id, descriptor.model_name
    ));

    match lifecycle.start(&descriptor).await {
        Ok(report) => {
            output::spinner_success(&pb, &format!("{} is ready", report.id));
            display(&report);
            Ok(0)
        }
        Err(err) => {
            output::spinner_fail(&pb, &format!("{} failed to start", descriptor.id));
            Err(err)
        }
    }
}

fn display(report: &StartReport) {
    if output::is_json() {
        output::json_output(&json!({
            "command": "start",
            "id": report.id,
            "model": report.model_name,
            "kind": report.kind,
            "endpoint": report.endpoint,
            "api_key": report.credential.expose(),
            "units": report
                .units
                .iter()
                .map(|(role, unit, port)| json!({ "role": role, "unit": unit, "port": port }))
                .collect::<Vec<_>>(),
            "replaced": report.replaced,
            "sync": report.sync,
            "attempts": report.attempts,
            "logs": report.logs,
        }));
        return;
    }

    if !report.replaced.is_empty() {
        output::field("Replaced", report.replaced.join(", "));
    }
    output::field("Model", &report.model_name);
    output::field("Endpoint", output::highlight(&report.endpoint));
    output::field("API key", report.credential.expose());
    for (role, unit, port) in &report.units {
        output::field(role.as_str(), format!("{unit} on port {port}"));
    }
    match &report.sync {
        Some(SyncOutcome::Created(id)) => output::field("Registry", format!("created {id}")),
        Some(SyncOutcome::Patched(ids)) => {
            output::field("Registry", format!("patched {}", ids.join(", ")));
        }
        None => output::field("Registry", output::muted("sync skipped")),
    }

    if !report.logs.is_empty() {
        output::section("Logs");
        for log in &report.logs {
            if let Some(path) = &log.log_out {
                output::field(&format!("{} out", log.unit), output::muted(path));
            }
            if let Some(path) = &log.log_err {
                output::field(&format!("{} err", log.unit), output::muted(path));
            }
        }
    }
}
