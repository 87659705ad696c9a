//! Container runtime port.
//!
//! Abstracts a backend that can launch, enumerate and terminate named,
//! isolated processes ("units"). A successful launch only means the process
//! started; it says nothing about whether the service inside is ready.

use async_trait::async_trait;

use crate::domain::{LaunchSpec, ShellSpec, UnitInfo};
use crate::error::Result;

/// Launch-and-enumerate API of an isolated execution backend.
///
/// # Errors
///
/// Launch failures surface as [`RuntimeError::Launch`] with the backend's
/// captured diagnostics; stop failures as [`RuntimeError::Stop`].
///
/// [`RuntimeError::Launch`]: crate::error::RuntimeError::Launch
/// [`RuntimeError::Stop`]: crate::error::RuntimeError::Stop
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Launch one unit.
    async fn run(&self, spec: &LaunchSpec) -> Result<UnitInfo>;

    /// Enumerate every unit the backend currently knows about.
    async fn list(&self) -> Result<Vec<UnitInfo>>;

    /// Whether a unit with this name exists.
    async fn exists(&self, unit: &str) -> Result<bool> {
        Ok(self.list().await?.iter().any(|info| info.name == unit))
    }

    /// Stop a unit. Stopping a unit that does not exist succeeds.
    async fn stop(&self, unit: &str) -> Result<()>;

    /// Run an interactive session, returning its exit code.
    async fn shell(&self, spec: &ShellSpec) -> Result<i32>;
}
