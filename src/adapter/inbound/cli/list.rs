//! Handler for the `list` command.

use std::path::Path;

use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::command::ListArgs;
use crate::adapter::inbound::cli::output;
use crate::domain::InstanceStatus;
use crate::error::Result;
use crate::infrastructure::bootstrap::{self, RegistryMode};
use crate::infrastructure::config::settings::Settings;

#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "State")]
    state: &'static str,
    #[tabled(rename = "Role")]
    role: &'static str,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "PID")]
    pid: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn rows(instances: &[InstanceStatus]) -> Vec<UnitRow> {
    instances
        .iter()
        .flat_map(|instance| {
            instance.units.iter().map(move |unit| UnitRow {
                instance: instance.id.to_string(),
                state: instance.state.as_str(),
                role: unit.role.as_str(),
                unit: if unit.present {
                    unit.unit.clone()
                } else {
                    format!("{} (missing)", unit.unit)
                },
                port: or_dash(unit.port),
                pid: or_dash(unit.pid),
                endpoint: or_dash(instance.endpoint.as_deref()),
            })
        })
        .collect()
}

/// Execute the list command.
///
/// Prints a JSON array to stdout unless `--table` is given.
pub async fn execute(settings: &Settings, state_dir: &Path, args: &ListArgs) -> Result<i32> {
    let lifecycle = bootstrap::build_lifecycle(settings, state_dir, RegistryMode::Disabled)?;
    let instances = lifecycle.list().await?;

    if !args.table || output::is_json() {
        output::json_output(&serde_json::to_value(&instances)?);
        return Ok(0);
    }

    if instances.is_empty() {
        output::hint("no instances; run `modelctl start <config>`");
        return Ok(0);
    }
    output::lines(&Table::new(rows(&instances)).to_string());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstanceId, ListedState, Role, UnitStatus};

    #[test]
    fn rows_flatten_units_and_mark_missing() {
        let status = InstanceStatus {
            id: InstanceId::new("sd"),
            model_name: Some("sdxl".into()),
            state: ListedState::Partial,
            endpoint: Some("http://127.0.0.1:50001/v1".into()),
            units: vec![
                UnitStatus {
                    role: Role::Server,
                    unit: "sd__server".into(),
                    present: true,
                    port: Some(50000),
                    pid: Some(42),
                    image: None,
                    log_out: None,
                    log_err: None,
                },
                UnitStatus {
                    role: Role::Adapter,
                    unit: "sd__adapter".into(),
                    present: false,
                    port: Some(50002),
                    pid: None,
                    image: None,
                    log_out: None,
                    log_err: None,
                },
            ],
        };

        let rows = rows(&[status]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pid, "42");
        assert_eq!(rows[1].unit, "sd__adapter (missing)");
        assert_eq!(rows[1].pid, "-");
        assert_eq!(rows[1].state, "partial");

        let table = Table::new(rows).to_string();
        assert!(table.contains("Instance"));
        assert!(table.contains("sd__server"));
    }
}
