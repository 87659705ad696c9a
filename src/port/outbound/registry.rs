//! Model registry port.

use async_trait::async_trait;

use crate::domain::{EntryPatch, NewEntry, RegistryEntry};
use crate::error::Result;

/// Narrow view of the external registry service.
///
/// Implementations authenticate with the management credential, never with
/// a per-instance credential.
#[async_trait]
pub trait Registry: Send + Sync {
    /// All entries whose name equals `name` exactly.
    async fn find_by_name(&self, name: &str) -> Result<Vec<RegistryEntry>>;

    /// Create a new entry.
    async fn create(&self, entry: &NewEntry) -> Result<RegistryEntry>;

    /// Patch endpoint and credential of the entry with `id`.
    async fn patch(&self, id: &str, patch: &EntryPatch) -> Result<()>;
}
