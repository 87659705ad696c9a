//! A lifecycle controller wired to in-memory collaborators.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::application::health::HealthPoller;
use crate::application::lifecycle::{Dependencies, LaunchSettings, Lifecycle};
use crate::application::lock::InstanceLocks;
use crate::application::ports::PortAllocator;
use crate::application::registry::RegistrySync;

use super::ports::SetPortProbe;
use super::probe::ScriptedProbe;
use super::records::MemoryRecords;
use super::registry::InMemoryRegistry;
use super::runtime::FakeRuntime;

/// Poll interval used by harness controllers.
pub const TICK: Duration = Duration::from_millis(10);

/// Port range used by harness controllers.
pub const PORTS: RangeInclusive<u16> = 50000..=50999;

/// Fakes plus the controller built over them.
pub struct Harness {
    pub runtime: Arc<FakeRuntime>,
    pub probe: Arc<ScriptedProbe>,
    pub registry: Arc<InMemoryRegistry>,
    pub records: Arc<MemoryRecords>,
    pub lifecycle: Lifecycle,
    _state_dir: TempDir,
}

/// Builder for [`Harness`].
pub struct HarnessBuilder {
    probe: ScriptedProbe,
    busy_ports: Vec<u16>,
    sync: bool,
    settings: LaunchSettings,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            probe: ScriptedProbe::always(),
            busy_ports: Vec::new(),
            sync: true,
            settings: LaunchSettings {
                image: Some("/images/server.sif".to_string()),
                adapter_image: Some("/images/adapter.sif".to_string()),
                health_timeout: Duration::from_secs(5),
                ..LaunchSettings::default()
            },
        }
    }
}

impl HarnessBuilder {
    #[must_use]
    pub fn probe(mut self, probe: ScriptedProbe) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn busy_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.busy_ports = ports.into_iter().collect();
        self
    }

    /// Disable registry reconciliation.
    #[must_use]
    pub fn no_sync(mut self) -> Self {
        self.sync = false;
        self
    }

    #[must_use]
    pub fn health_timeout(mut self, timeout: Duration) -> Self {
        self.settings.health_timeout = timeout;
        self
    }

    #[must_use]
    pub fn settings(mut self, f: impl FnOnce(&mut LaunchSettings)) -> Self {
        f(&mut self.settings);
        self
    }

    /// # Panics
    ///
    /// Panics if a temporary state directory cannot be created.
    pub fn build(self) -> Harness {
        let state_dir = tempfile::tempdir().expect("create temp state dir");
        let runtime = Arc::new(FakeRuntime::new());
        let probe = Arc::new(self.probe);
        let registry = Arc::new(InMemoryRegistry::new());
        let records = Arc::new(MemoryRecords::new());

        let deps = Dependencies {
            runtime: runtime.clone(),
            ports: PortAllocator::new(Arc::new(SetPortProbe::busy(self.busy_ports)), PORTS),
            poller: HealthPoller::new(probe.clone(), TICK),
            registry: self
                .sync
                .then(|| RegistrySync::new(registry.clone())),
            records: records.clone(),
            locks: InstanceLocks::new(state_dir.path().join("locks")),
        };

        Harness {
            runtime,
            probe,
            registry,
            records,
            lifecycle: Lifecycle::new(deps, self.settings),
            _state_dir: state_dir,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Harness with every check ready on first probe and sync enabled.
    pub fn new() -> Self {
        Self::builder().build()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
