//! Reconciled view of an instance as reported by `list`.

use serde::Serialize;

use super::{InstanceId, RecordState, Role};

/// Derived state of an instance, combining runtime presence and records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListedState {
    Starting,
    Unhealthy,
    Unregistered,
    Published,
    Running,
    /// Some but not all expected units are present.
    Partial,
    /// Units present without a record.
    Orphaned,
    /// Record present, no units running.
    Stale,
}

impl ListedState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Unhealthy => "unhealthy",
            Self::Unregistered => "unregistered",
            Self::Published => "published",
            Self::Running => "running",
            Self::Partial => "partial",
            Self::Orphaned => "orphaned",
            Self::Stale => "stale",
        }
    }
}

impl From<RecordState> for ListedState {
    fn from(state: RecordState) -> Self {
        match state {
            RecordState::Starting => Self::Starting,
            RecordState::Unhealthy => Self::Unhealthy,
            RecordState::Unregistered => Self::Unregistered,
            RecordState::Published => Self::Published,
            RecordState::Running => Self::Running,
        }
    }
}

/// One role of a listed instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    pub role: Role,
    pub unit: String,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_err: Option<String>,
}

/// One listed instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceStatus {
    pub id: InstanceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    pub state: ListedState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub units: Vec<UnitStatus>,
}
