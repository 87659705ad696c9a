//! Model registry entries, owned by the external registry service.

use serde::{Deserialize, Serialize};

/// An entry as returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    pub name: String,
    pub upstream_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub provider: String,
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEntry {
    pub name: String,
    pub upstream_url: String,
    pub api_key: String,
    pub provider: String,
}

/// Body of a patch request. Only endpoint and credential are touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPatch {
    pub upstream_url: String,
    pub api_key: String,
}

/// What an upsert did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "ids", rename_all = "lowercase")]
pub enum SyncOutcome {
    Created(String),
    Patched(Vec<String>),
}
