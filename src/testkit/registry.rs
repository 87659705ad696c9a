//! In-memory registry with failure injection.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::{EntryPatch, NewEntry, RegistryEntry};
use crate::error::{RegistryError, Result};
use crate::port::outbound::registry::Registry;

#[derive(Debug, Default)]
struct State {
    entries: Vec<RegistryEntry>,
    create_calls: usize,
    patch_calls: usize,
    failing_patches: HashSet<String>,
    fail_lookups: bool,
    fail_creates: bool,
}

/// Registry keeping entries in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    state: Mutex<State>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry directly, bypassing call accounting. Returns its id.
    pub fn seed(&self, name: &str, upstream_url: &str, api_key: &str, provider: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.state.lock().entries.push(RegistryEntry {
            id: id.clone(),
            name: name.to_string(),
            upstream_url: upstream_url.to_string(),
            api_key: api_key.to_string(),
            provider: provider.to_string(),
        });
        id
    }

    pub fn entries_named(&self, name: &str) -> Vec<RegistryEntry> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.name == name)
            .cloned()
            .collect()
    }

    pub fn entry(&self, id: &str) -> Option<RegistryEntry> {
        self.state
            .lock()
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().create_calls
    }

    pub fn patch_calls(&self) -> usize {
        self.state.lock().patch_calls
    }

    /// Make patches of `id` fail.
    pub fn fail_patch(&self, id: &str) {
        self.state.lock().failing_patches.insert(id.to_string());
    }

    /// Make every lookup fail.
    pub fn fail_lookups(&self) {
        self.state.lock().fail_lookups = true;
    }

    /// Make every create fail.
    pub fn fail_creates(&self) {
        self.state.lock().fail_creates = true;
    }
}

fn injected(operation: &'static str) -> crate::error::Error {
    RegistryError::Status {
        operation,
        status: 500,
        body: "injected failure".to_string(),
    }
    .into()
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn find_by_name(&self, name: &str) -> Result<Vec<RegistryEntry>> {
        if self.state.lock().fail_lookups {
            return Err(injected("lookup"));
        }
        Ok(self.entries_named(name))
    }

    async fn create(&self, entry: &NewEntry) -> Result<RegistryEntry> {
        let mut state = self.state.lock();
        state.create_calls += 1;
        if state.fail_creates {
            return Err(injected("create"));
        }
        let created = RegistryEntry {
            id: Uuid::new_v4().to_string(),
            name: entry.name.clone(),
            upstream_url: entry.upstream_url.clone(),
            api_key: entry.api_key.clone(),
            provider: entry.provider.clone(),
        };
        state.entries.push(created.clone());
        Ok(created)
    }

    async fn patch(&self, id: &str, patch: &EntryPatch) -> Result<()> {
        let mut state = self.state.lock();
        state.patch_calls += 1;
        if state.failing_patches.contains(id) {
            return Err(injected("patch"));
        }
        let entry = state
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| RegistryError::Status {
                operation: "patch",
                status: 404,
                body: format!("no entry {id}"),
            })?;
        entry.upstream_url = patch.upstream_url.clone();
        entry.api_key = patch.api_key.clone();
        Ok(())
    }
}
