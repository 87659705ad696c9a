//! Bookkeeping record of a started instance.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{InstanceId, InstanceKind, Role};

/// Current record format version.
pub const RECORD_VERSION: &str = "1";

/// How far the last `start` got for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// Units launched, readiness not yet confirmed.
    Starting,
    /// Readiness deadline expired; units left running for inspection.
    Unhealthy,
    /// Healthy, but the registry sync failed.
    Unregistered,
    /// Healthy and published to the registry.
    Published,
    /// Healthy with registry sync disabled.
    Running,
}

impl RecordState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Unhealthy => "unhealthy",
            Self::Unregistered => "unregistered",
            Self::Published => "published",
            Self::Running => "running",
        }
    }
}

/// Persisted facts about an instance. The credential is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub version: String,
    pub id: InstanceId,
    pub model_name: String,
    pub kind: InstanceKind,
    /// Unit name per role.
    pub units: BTreeMap<Role, String>,
    /// Port per role.
    pub ports: BTreeMap<Role, u16>,
    /// Published inference endpoint.
    pub endpoint: String,
    pub provider: String,
    pub state: RecordState,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstanceRecord {
    /// Move to `state`, bumping `updated_at`.
    pub fn transition(&mut self, state: RecordState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
