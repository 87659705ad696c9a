//! Instance lifecycle controller.
//!
//! Composes identity, port allocation, credentials, the runtime, readiness
//! polling and registry reconciliation into `start`, `stop`, `list` and
//! `shell`.
//!
//! Per instance id the states are `Absent → Starting → Running → Stopping
//! → Absent`. A `start` on a running instance stops it first. Failures
//! after launch never roll back: units that started keep running so the
//! operator can inspect their logs, and the persisted record tells `list`
//! how far the start got.
//!
//! Everything runs sequentially on the caller's task. Port and existence
//! checks are check-then-act; the per-id advisory lock only protects
//! against concurrent invocations on the same host.

mod list;
mod plan;


use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::application::credential;
use crate::application::health::{self, HealthPoller};
use crate::application::lock::InstanceLocks;
use crate::application::ports::PortAllocator;
use crate::application::registry::RegistrySync;
use crate::domain::record::RECORD_VERSION;
use crate::domain::{
    Credential, InstanceDescriptor, InstanceId, InstanceKind, InstanceRecord, InstanceStatus,
    Mount, RecordState, Role, ShellSpec, SyncOutcome, UnitLogs,
};
use crate::error::{Error, Result, StartStage};
use crate::port::outbound::probe::HealthCheck;
use crate::port::outbound::records::RecordStore;
use crate::port::outbound::runtime::Runtime;

pub use plan::{endpoint_url, plan_roles, RolePlan, CACHE_TARGET, CONFIG_TARGET, MODELS_TARGET};

/// Every role an id can own, in stop order.
const ALL_ROLES: [Role; 3] = [Role::Primary, Role::Server, Role::Adapter];

/// Launch parameters shared by every instance this controller starts.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    /// Primary or server image.
    pub image: Option<String>,
    /// Adapter image for composite instances.
    pub adapter_image: Option<String>,
    /// Expose host GPUs to compute units.
    pub gpu: bool,
    /// Device selection (`CUDA_VISIBLE_DEVICES`).
    pub devices: Option<String>,
    /// Host cache root bound at [`CACHE_TARGET`].
    pub cache_dir: Option<PathBuf>,
    /// Additional binds for compute units.
    pub extra_binds: Vec<Mount>,
    /// Host published in registry endpoints.
    pub advertise_host: String,
    /// Supplied credential; generated when absent.
    pub api_key: Option<String>,
    /// Readiness deadline.
    pub health_timeout: Duration,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            image: None,
            adapter_image: None,
            gpu: true,
            devices: None,
            cache_dir: None,
            extra_binds: Vec::new(),
            advertise_host: "127.0.0.1".to_string(),
            api_key: None,
            health_timeout: health::DEFAULT_TIMEOUT,
        }
    }
}

/// Collaborators of the controller.
pub struct Dependencies {
    pub runtime: Arc<dyn Runtime>,
    pub ports: PortAllocator,
    pub poller: HealthPoller,
    /// `None` disables registry reconciliation.
    pub registry: Option<RegistrySync>,
    pub records: Arc<dyn RecordStore>,
    pub locks: InstanceLocks,
}

/// Result of a successful `start`.
#[derive(Debug, Clone)]
pub struct StartReport {
    pub id: InstanceId,
    pub model_name: String,
    pub kind: InstanceKind,
    /// `(role, unit, port)` in launch order.
    pub units: Vec<(Role, String, u16)>,
    pub endpoint: String,
    pub credential: Credential,
    /// Units stopped before launching.
    pub replaced: Vec<String>,
    pub sync: Option<SyncOutcome>,
    pub attempts: u32,
    pub logs: Vec<UnitLogs>,
}

/// Result of a `stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopReport {
    pub id: InstanceId,
    /// Units a stop was attempted for.
    pub stopped: Vec<String>,
    /// `false` when nothing was running.
    pub was_running: bool,
}

/// A prepared, untracked debug session.
#[derive(Debug, Clone)]
pub struct ShellSession {
    pub spec: ShellSpec,
    pub credential: Credential,
    pub port: u16,
}

/// The lifecycle state machine over the runtime's instance namespace.
pub struct Lifecycle {
    runtime: Arc<dyn Runtime>,
    ports: PortAllocator,
    poller: HealthPoller,
    registry: Option<RegistrySync>,
    records: Arc<dyn RecordStore>,
    locks: InstanceLocks,
    settings: LaunchSettings,
}

impl Lifecycle {
    pub fn new(deps: Dependencies, settings: LaunchSettings) -> Self {
        Self {
            runtime: deps.runtime,
            ports: deps.ports,
            poller: deps.poller,
            registry: deps.registry,
            records: deps.records,
            locks: deps.locks,
            settings,
        }
    }

    /// Whether every role of the instance exists in the runtime.
    ///
    /// # Errors
    ///
    /// Propagates runtime enumeration failures.
    pub async fn exists(&self, desc: &InstanceDescriptor) -> Result<bool> {
        let present = self.present_units(&desc.id).await?;
        Ok(desc.unit_names().iter().all(|unit| present.contains(unit)))
    }

    /// Start (or restart) the instance described by `desc`.
    ///
    /// # Errors
    ///
    /// Returns a config error if a required image is missing, before
    /// anything is touched. Otherwise returns [`Error::Start`] tagged with
    /// the failing stage; units launched before the failure are left
    /// running and their log paths are attached.
    pub async fn start(&self, desc: &InstanceDescriptor) -> Result<StartReport> {
        plan::check_images(desc, &self.settings)?;

        let mut lock = self
            .locks
            .open(&desc.id)
            .map_err(|e| e.at_stage(StartStage::Lock, Vec::new()))?;
        let _guard = lock
            .try_acquire()
            .map_err(|e| e.at_stage(StartStage::Lock, Vec::new()))?;

        let replaced = self
            .replace_existing(&desc.id)
            .await
            .map_err(|e| e.at_stage(StartStage::StopExisting, Vec::new()))?;

        let credential = credential::supplied_or_generate(self.settings.api_key.as_deref());
        let plans = self
            .plan(desc, &credential)
            .await
            .map_err(|e| e.at_stage(StartStage::Allocate, Vec::new()))?;

        let ports: BTreeMap<Role, u16> = plans.iter().map(|p| (p.role, p.port)).collect();
        let public_port = ports
            .get(&desc.kind.public_role())
            .copied()
            .unwrap_or_default();
        let endpoint = endpoint_url(&self.settings.advertise_host, public_port);

        let now = Utc::now();
        let mut record = InstanceRecord {
            version: RECORD_VERSION.to_string(),
            id: desc.id.clone(),
            model_name: desc.model_name.clone(),
            kind: desc.kind,
            units: plans.iter().map(|p| (p.role, p.spec.unit.clone())).collect(),
            ports,
            endpoint: endpoint.clone(),
            provider: desc.provider.clone(),
            state: RecordState::Starting,
            started_at: now,
            updated_at: now,
        };

        for (index, plan) in plans.iter().enumerate() {
            info!(
                id = %desc.id,
                role = %plan.role,
                unit = %plan.spec.unit,
                port = plan.port,
                "Launching unit"
            );
            if let Err(e) = self.runtime.run(&plan.spec).await {
                if index > 0 {
                    warn!(id = %desc.id, "Partial launch; earlier units left running");
                    self.persist(&record);
                }
                let logs = self.collect_logs(&desc.id).await;
                return Err(e.at_stage(StartStage::Launch, logs));
            }
        }
        self.persist(&record);

        let checks: Vec<HealthCheck> = plans.iter().flat_map(|p| p.checks.clone()).collect();
        let attempts = match self
            .poller
            .await_healthy(&checks, self.settings.health_timeout)
            .await
        {
            Ok(attempts) => attempts,
            Err(e) => {
                record.transition(RecordState::Unhealthy);
                self.persist(&record);
                let logs = self.collect_logs(&desc.id).await;
                return Err(e.at_stage(StartStage::Health, logs));
            }
        };

        let sync = match &self.registry {
            Some(registry) => {
                match registry
                    .upsert(&desc.model_name, &endpoint, &credential, &desc.provider)
                    .await
                {
                    Ok(outcome) => {
                        record.transition(RecordState::Published);
                        Some(outcome)
                    }
                    Err(e) => {
                        // The instance stays up; the operator re-syncs or stops it.
                        record.transition(RecordState::Unregistered);
                        self.persist(&record);
                        let logs = self.collect_logs(&desc.id).await;
                        return Err(e.at_stage(StartStage::Registry, logs));
                    }
                }
            }
            None => {
                record.transition(RecordState::Running);
                None
            }
        };
        self.persist(&record);

        info!(
            id = %desc.id,
            model = %desc.model_name,
            endpoint = %endpoint,
            state = record.state.as_str(),
            "Instance started"
        );

        Ok(StartReport {
            id: desc.id.clone(),
            model_name: desc.model_name.clone(),
            kind: desc.kind,
            units: plans
                .iter()
                .map(|p| (p.role, p.spec.unit.clone(), p.port))
                .collect(),
            endpoint,
            credential,
            replaced,
            sync,
            attempts,
            logs: self.collect_logs(&desc.id).await,
        })
    }

    /// Stop every role of the instance.
    ///
    /// A stop is attempted for each role even when an earlier one fails.
    /// Stopping an absent instance is a no-op reported through
    /// [`StopReport::was_running`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] on lock contention and [`Error::Stop`] listing
    /// every unit that failed to stop.
    pub async fn stop(&self, desc: &InstanceDescriptor) -> Result<StopReport> {
        let mut lock = self.locks.open(&desc.id)?;
        let _guard = lock.try_acquire()?;

        let present = self.present_units(&desc.id).await?;
        if present.is_empty() {
            warn!(id = %desc.id, "Instance is not running; nothing to stop");
            self.forget(&desc.id);
            return Ok(StopReport {
                id: desc.id.clone(),
                stopped: Vec::new(),
                was_running: false,
            });
        }

        let expected: BTreeSet<String> = desc.unit_names().into_iter().collect();
        let units: Vec<String> = ALL_ROLES
            .iter()
            .map(|role| role.unit_name(&desc.id))
            .filter(|unit| expected.contains(unit) || present.contains(unit))
            .collect();

        self.stop_units(&units).await?;
        self.forget(&desc.id);
        info!(id = %desc.id, units = ?units, "Instance stopped");

        Ok(StopReport {
            id: desc.id.clone(),
            stopped: units,
            was_running: true,
        })
    }

    /// Reconciled view of runtime units and instance records.
    ///
    /// # Errors
    ///
    /// Propagates runtime enumeration and record store failures.
    pub async fn list(&self) -> Result<Vec<InstanceStatus>> {
        let units = self.runtime.list().await?;
        let records = self.records.all()?;
        Ok(list::reconcile(units, records))
    }

    /// Prepare an interactive session with its own credential and port.
    ///
    /// # Errors
    ///
    /// Returns a config error without an image, or
    /// [`Error::PortExhausted`].
    pub async fn prepare_shell(&self, image: Option<&str>) -> Result<ShellSession> {
        let image = image
            .map(str::to_string)
            .or_else(|| self.settings.image.clone())
            .filter(|image| !image.trim().is_empty())
            .ok_or(crate::error::ConfigError::MissingField {
                field: "runtime.image",
            })?;
        let credential = credential::supplied_or_generate(self.settings.api_key.as_deref());
        let port = self.ports.find_free_port().await?;

        let mut env = BTreeMap::from([
            ("API_KEY".to_string(), credential.expose().to_string()),
            ("PORT".to_string(), port.to_string()),
        ]);
        if let Some(devices) = &self.settings.devices {
            env.insert("CUDA_VISIBLE_DEVICES".to_string(), devices.clone());
        }
        let mut mounts = Vec::new();
        if let Some(cache) = &self.settings.cache_dir {
            env.insert("HF_HOME".to_string(), format!("{CACHE_TARGET}/huggingface"));
            mounts.push(Mount::read_write(cache, CACHE_TARGET));
        }
        mounts.extend(self.settings.extra_binds.iter().cloned());

        Ok(ShellSession {
            spec: ShellSpec {
                image,
                env,
                mounts,
                gpu: self.settings.gpu,
            },
            credential,
            port,
        })
    }

    /// Run a prepared session to completion, returning its exit code.
    ///
    /// # Errors
    ///
    /// Propagates runtime failures to spawn the session.
    pub async fn run_shell(&self, session: &ShellSession) -> Result<i32> {
        info!(image = %session.spec.image, port = session.port, "Opening shell");
        self.runtime.shell(&session.spec).await
    }

    async fn plan(
        &self,
        desc: &InstanceDescriptor,
        credential: &Credential,
    ) -> Result<Vec<RolePlan>> {
        let ports = plan::allocate_ports(&self.ports, desc).await?;
        plan_roles(desc, &self.settings, &ports, credential)
    }

    /// Stop whatever units of `id` are present. Returns the stopped units.
    async fn replace_existing(&self, id: &InstanceId) -> Result<Vec<String>> {
        let present = self.present_units(id).await?;
        if present.is_empty() {
            return Ok(Vec::new());
        }
        info!(id = %id, units = ?present, "Instance already running; stopping before start");
        let units: Vec<String> = ALL_ROLES
            .iter()
            .map(|role| role.unit_name(id))
            .filter(|unit| present.contains(unit))
            .collect();
        self.stop_units(&units).await?;
        self.forget(id);
        Ok(units)
    }

    /// Unit names of `id` currently known to the runtime.
    async fn present_units(&self, id: &InstanceId) -> Result<BTreeSet<String>> {
        let candidates: BTreeSet<String> =
            ALL_ROLES.iter().map(|role| role.unit_name(id)).collect();
        Ok(self
            .runtime
            .list()
            .await?
            .into_iter()
            .map(|info| info.name)
            .filter(|name| candidates.contains(name))
            .collect())
    }

    /// Stop each unit independently, aggregating failures.
    async fn stop_units(&self, units: &[String]) -> Result<()> {
        let mut failures = Vec::new();
        for unit in units {
            match self.runtime.stop(unit).await {
                Ok(()) => info!(unit = %unit, "Stopped unit"),
                Err(e) => {
                    warn!(unit = %unit, error = %e, "Failed to stop unit");
                    failures.push(format!("{unit}: {e}"));
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Stop { failures })
        }
    }

    /// Log locations of every present unit of `id`. Best effort.
    async fn collect_logs(&self, id: &InstanceId) -> Vec<UnitLogs> {
        match self.runtime.list().await {
            Ok(units) => units
                .iter()
                .filter(|info| Role::parse_unit(&info.name).0 == *id)
                .map(|info| info.logs())
                .collect(),
            Err(e) => {
                warn!(id = %id, error = %e, "Could not enumerate units for log locations");
                Vec::new()
            }
        }
    }

    fn persist(&self, record: &InstanceRecord) {
        if let Err(e) = self.records.save(record) {
            warn!(id = %record.id, error = %e, "Failed to write instance record");
        }
    }

    fn forget(&self, id: &InstanceId) {
        if let Err(e) = self.records.remove(id) {
            warn!(id = %id, error = %e, "Failed to remove instance record");
        }
    }
}
