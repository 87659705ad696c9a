//! Idempotent registry reconciliation.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{Credential, EntryPatch, NewEntry, SyncOutcome};
use crate::error::{Error, Result};
use crate::port::outbound::registry::Registry;

/// Create-or-update of a named model entry.
///
/// When several entries already share the model name, every one of them is
/// patched. This tolerates pre-existing duplicates without manual cleanup,
/// at the cost of also touching stale entries the operator may not have
/// meant to update.
pub struct RegistrySync {
    registry: Arc<dyn Registry>,
}

impl RegistrySync {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Publish `endpoint` and `credential` under `model_name`.
    ///
    /// All patches are attempted even when one fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistrySync`] if the lookup, the create, or any
    /// patch fails.
    pub async fn upsert(
        &self,
        model_name: &str,
        endpoint: &str,
        credential: &Credential,
        provider: &str,
    ) -> Result<SyncOutcome> {
        let sync_error = |reason: String| Error::RegistrySync {
            model: model_name.to_string(),
            reason,
        };

        let matches = self
            .registry
            .find_by_name(model_name)
            .await
            .map_err(|e| sync_error(format!("lookup failed: {e}")))?;

        if matches.is_empty() {
            let entry = NewEntry {
                name: model_name.to_string(),
                upstream_url: endpoint.to_string(),
                api_key: credential.expose().to_string(),
                provider: provider.to_string(),
            };
            let created = self
                .registry
                .create(&entry)
                .await
                .map_err(|e| sync_error(format!("create failed: {e}")))?;
            info!(model = model_name, id = %created.id, endpoint, "Registry entry created");
            return Ok(SyncOutcome::Created(created.id));
        }

        if matches.len() > 1 {
            warn!(
                model = model_name,
                count = matches.len(),
                "Multiple registry entries share this name; patching all of them"
            );
        }

        let patch = EntryPatch {
            upstream_url: endpoint.to_string(),
            api_key: credential.expose().to_string(),
        };
        let mut patched = Vec::with_capacity(matches.len());
        let mut failures = Vec::new();
        for entry in &matches {
            match self.registry.patch(&entry.id, &patch).await {
                Ok(()) => patched.push(entry.id.clone()),
                Err(e) => {
                    warn!(model = model_name, id = %entry.id, error = %e, "Registry patch failed");
                    failures.push(format!("{}: {e}", entry.id));
                }
            }
        }

        if !failures.is_empty() {
            return Err(sync_error(format!(
                "patch failed for {}",
                failures.join("; ")
            )));
        }
        info!(model = model_name, ids = ?patched, endpoint, "Registry entries patched");
        Ok(SyncOutcome::Patched(patched))
    }
}
