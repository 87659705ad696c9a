//! Merge runtime enumeration with instance records.

use std::collections::BTreeMap;

use crate::domain::{
    InstanceId, InstanceRecord, InstanceStatus, ListedState, Role, UnitInfo, UnitStatus,
};

/// Group units by instance id and derive each instance's state.
///
/// Instances are returned sorted by id, units in role order.
pub(super) fn reconcile(units: Vec<UnitInfo>, records: Vec<InstanceRecord>) -> Vec<InstanceStatus> {
    let mut present: BTreeMap<InstanceId, BTreeMap<Role, UnitInfo>> = BTreeMap::new();
    for info in units {
        let (id, role) = Role::parse_unit(&info.name);
        present.entry(id).or_default().insert(role, info);
    }

    let mut records: BTreeMap<InstanceId, InstanceRecord> = records
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect();

    let mut ids: Vec<InstanceId> = present.keys().chain(records.keys()).cloned().collect();
    ids.sort();
    ids.dedup();

    ids.into_iter()
        .map(|id| {
            let units = present.remove(&id).unwrap_or_default();
            match records.remove(&id) {
                Some(record) => with_record(id, record, units),
                None => orphaned(id, units),
            }
        })
        .collect()
}

fn with_record(
    id: InstanceId,
    record: InstanceRecord,
    mut units: BTreeMap<Role, UnitInfo>,
) -> InstanceStatus {
    let expected = record.kind.roles();
    let found = expected.iter().filter(|role| units.contains_key(role)).count();
    let state = if found == 0 && units.is_empty() {
        ListedState::Stale
    } else if found < expected.len() {
        ListedState::Partial
    } else {
        record.state.into()
    };

    let mut statuses: Vec<UnitStatus> = expected
        .iter()
        .map(|&role| {
            let unit = record
                .units
                .get(&role)
                .cloned()
                .unwrap_or_else(|| role.unit_name(&id));
            let port = record.ports.get(&role).copied();
            unit_status(role, unit, port, units.remove(&role))
        })
        .collect();
    // Units of a role the record does not expect, e.g. after a kind change.
    statuses.extend(
        units
            .into_iter()
            .map(|(role, info)| unit_status(role, info.name.clone(), None, Some(info))),
    );
    statuses.sort_by_key(|status| status.role);

    InstanceStatus {
        id,
        model_name: Some(record.model_name),
        state,
        endpoint: Some(record.endpoint),
        units: statuses,
    }
}

fn orphaned(id: InstanceId, units: BTreeMap<Role, UnitInfo>) -> InstanceStatus {
    InstanceStatus {
        id,
        model_name: None,
        state: ListedState::Orphaned,
        endpoint: None,
        units: units
            .into_iter()
            .map(|(role, info)| unit_status(role, info.name.clone(), None, Some(info)))
            .collect(),
    }
}

fn unit_status(role: Role, unit: String, port: Option<u16>, info: Option<UnitInfo>) -> UnitStatus {
    match info {
        Some(info) => UnitStatus {
            role,
            unit,
            present: true,
            port,
            pid: info.pid,
            image: info.image,
            log_out: info.log_out,
            log_err: info.log_err,
        },
        None => UnitStatus {
            role,
            unit,
            present: false,
            port,
            pid: None,
            image: None,
            log_out: None,
            log_err: None,
        },
    }
}
