//! Composition root: wires real adapters into the lifecycle controller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::adapter::outbound::apptainer::Apptainer;
use crate::adapter::outbound::http::HttpProbe;
use crate::adapter::outbound::records::FileRecordStore;
use crate::adapter::outbound::registry::HttpRegistry;
use crate::adapter::outbound::tcp::TcpPortProbe;
use crate::application::health::HealthPoller;
use crate::application::lifecycle::{Dependencies, Lifecycle};
use crate::application::lock::InstanceLocks;
use crate::application::ports::PortAllocator;
use crate::application::registry::RegistrySync;
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Settings;

/// Record directory under the state directory.
const INSTANCES_DIR: &str = "instances";
/// Lock directory under the state directory.
const LOCKS_DIR: &str = "locks";

/// Whether `start` reconciles the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryMode {
    Enabled,
    Disabled,
}

/// Paths derived from the state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    pub instances: PathBuf,
    pub locks: PathBuf,
}

impl StateLayout {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            instances: state_dir.join(INSTANCES_DIR),
            locks: state_dir.join(LOCKS_DIR),
        }
    }
}

/// Build the registry synchronizer from settings.
///
/// # Errors
///
/// Returns [`ConfigError::MissingField`] when no registry URL is set.
pub fn build_registry(settings: &Settings) -> Result<RegistrySync> {
    let url = settings
        .registry
        .url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or(ConfigError::MissingField {
            field: "registry.url",
        })?;
    let token = settings.registry.token.clone().unwrap_or_default();
    if token.is_empty() {
        debug!("No registry management token configured");
    }
    let client = HttpRegistry::new(url, token, settings.registry_timeout())?;
    info!(url, "Registry sync enabled");
    Ok(RegistrySync::new(Arc::new(client)))
}

/// Build a controller over Apptainer, HTTP probes and file records.
///
/// # Errors
///
/// Returns a config error for an unusable registry or bind configuration.
pub fn build_lifecycle(
    settings: &Settings,
    state_dir: &Path,
    mode: RegistryMode,
) -> Result<Lifecycle> {
    let registry = match mode {
        RegistryMode::Enabled => Some(build_registry(settings)?),
        RegistryMode::Disabled => {
            info!("Registry sync disabled");
            None
        }
    };

    let layout = StateLayout::new(state_dir);
    let deps = Dependencies {
        runtime: Arc::new(Apptainer::new(settings.runtime.binary.clone())),
        ports: PortAllocator::new(
            Arc::new(TcpPortProbe::new(settings.probe_timeout())),
            settings.port_range(),
        ),
        poller: HealthPoller::new(
            Arc::new(HttpProbe::new(settings.probe_request_timeout())?),
            settings.poll_interval(),
        ),
        registry,
        records: Arc::new(FileRecordStore::new(layout.instances)),
        locks: InstanceLocks::new(layout.locks),
    };
    debug!(state_dir = %state_dir.display(), "Lifecycle controller wired");

    Ok(Lifecycle::new(deps, settings.launch_settings()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn sync_requires_registry_url() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_lifecycle(&Settings::default(), dir.path(), RegistryMode::Enabled)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField {
                field: "registry.url"
            })
        ));
    }

    #[test]
    fn no_sync_builds_without_registry() {
        let dir = tempfile::tempdir().unwrap();
        assert!(build_lifecycle(&Settings::default(), dir.path(), RegistryMode::Disabled).is_ok());
    }

    #[test]
    fn state_layout_nests_under_state_dir() {
        let layout = StateLayout::new(Path::new("/var/lib/modelctl"));
        assert_eq!(layout.instances, PathBuf::from("/var/lib/modelctl/instances"));
        assert_eq!(layout.locks, PathBuf::from("/var/lib/modelctl/locks"));
    }
}
