//! In-memory container runtime.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{LaunchSpec, ShellSpec, UnitInfo};
use crate::error::{Result, RuntimeError};
use crate::port::outbound::runtime::Runtime;

#[derive(Debug, Default)]
struct State {
    units: BTreeMap<String, (LaunchSpec, UnitInfo)>,
    launched: Vec<LaunchSpec>,
    stopped: Vec<String>,
    shells: Vec<ShellSpec>,
    failing_launches: HashSet<String>,
    failing_stops: HashSet<String>,
    next_pid: u32,
}

/// Runtime that keeps units in memory and records every call.
///
/// Launched units report log paths under `/logs/{unit}.{out,err}`.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make launches of `unit` fail.
    pub fn fail_launch(&self, unit: &str) {
        self.state.lock().failing_launches.insert(unit.to_string());
    }

    /// Make stops of `unit` fail; the unit keeps running.
    pub fn fail_stop(&self, unit: &str) {
        self.state.lock().failing_stops.insert(unit.to_string());
    }

    /// Drop a unit as if it exited on its own.
    pub fn kill(&self, unit: &str) {
        self.state.lock().units.remove(unit);
    }

    /// Register a unit that was not launched through this runtime.
    pub fn adopt(&self, unit: &str) {
        let spec = LaunchSpec {
            unit: unit.to_string(),
            image: "foreign.sif".to_string(),
            env: BTreeMap::new(),
            mounts: Vec::new(),
            args: Vec::new(),
            gpu: false,
        };
        let info = self.info_for(&spec);
        self.state.lock().units.insert(unit.to_string(), (spec, info));
    }

    /// Names of the units currently running.
    pub fn running(&self) -> Vec<String> {
        self.state.lock().units.keys().cloned().collect()
    }

    /// Every launch attempt, in order, including failed ones.
    pub fn launched(&self) -> Vec<LaunchSpec> {
        self.state.lock().launched.clone()
    }

    /// Spec of the running unit `unit`.
    pub fn spec(&self, unit: &str) -> Option<LaunchSpec> {
        self.state.lock().units.get(unit).map(|(spec, _)| spec.clone())
    }

    /// Every stop attempt, in order, including failed ones.
    pub fn stopped(&self) -> Vec<String> {
        self.state.lock().stopped.clone()
    }

    pub fn shells(&self) -> Vec<ShellSpec> {
        self.state.lock().shells.clone()
    }

    fn info_for(&self, spec: &LaunchSpec) -> UnitInfo {
        let mut state = self.state.lock();
        state.next_pid += 1;
        UnitInfo {
            name: spec.unit.clone(),
            pid: Some(1000 + state.next_pid),
            image: Some(spec.image.clone()),
            log_out: Some(format!("/logs/{}.out", spec.unit)),
            log_err: Some(format!("/logs/{}.err", spec.unit)),
        }
    }
}

#[async_trait]
impl Runtime for FakeRuntime {
    async fn run(&self, spec: &LaunchSpec) -> Result<UnitInfo> {
        {
            let mut state = self.state.lock();
            state.launched.push(spec.clone());
            if state.failing_launches.contains(&spec.unit) {
                return Err(RuntimeError::Launch {
                    unit: spec.unit.clone(),
                    diagnostics: "injected failure".to_string(),
                }
                .into());
            }
            if state.units.contains_key(&spec.unit) {
                return Err(RuntimeError::Launch {
                    unit: spec.unit.clone(),
                    diagnostics: "instance already exists".to_string(),
                }
                .into());
            }
        }
        let info = self.info_for(spec);
        self.state
            .lock()
            .units
            .insert(spec.unit.clone(), (spec.clone(), info.clone()));
        Ok(info)
    }

    async fn list(&self) -> Result<Vec<UnitInfo>> {
        Ok(self
            .state
            .lock()
            .units
            .values()
            .map(|(_, info)| info.clone())
            .collect())
    }

    async fn stop(&self, unit: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.stopped.push(unit.to_string());
        if state.failing_stops.contains(unit) {
            return Err(RuntimeError::Stop {
                unit: unit.to_string(),
                diagnostics: "injected failure".to_string(),
            }
            .into());
        }
        state.units.remove(unit);
        Ok(())
    }

    async fn shell(&self, spec: &ShellSpec) -> Result<i32> {
        self.state.lock().shells.push(spec.clone());
        Ok(0)
    }
}
