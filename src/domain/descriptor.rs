//! Instance descriptor derived from a model configuration file.

use std::path::PathBuf;

use super::{InstanceId, InstanceKind};

/// Registry provider tag used when the descriptor does not name one.
pub const DEFAULT_PROVIDER: &str = "openai";

/// Everything one invocation needs to know about a configured model.
///
/// Recomputed on every invocation from the configuration file; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDescriptor {
    /// Canonical id derived from the config path.
    pub id: InstanceId,
    /// Model name, used as the registry lookup key.
    pub model_name: String,
    /// Path of the configuration file the descriptor was read from.
    pub config_path: PathBuf,
    /// Single-process or composite.
    pub kind: InstanceKind,
    /// Model repository directory for composite deployments.
    pub model_repository: Option<PathBuf>,
    /// Override for the host cache root.
    pub cache_dir: Option<PathBuf>,
    /// Registry provider tag (protocol dialect).
    pub provider: String,
}

impl InstanceDescriptor {
    /// Minimal single-process descriptor, mostly useful in tests.
    pub fn single(id: impl Into<InstanceId>, model_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model_name: model_name.into(),
            config_path: PathBuf::new(),
            kind: InstanceKind::Single,
            model_repository: None,
            cache_dir: None,
            provider: DEFAULT_PROVIDER.to_string(),
        }
    }

    /// Minimal composite descriptor, mostly useful in tests.
    pub fn composite(
        id: impl Into<InstanceId>,
        model_name: impl Into<String>,
        model_repository: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind: InstanceKind::Composite,
            model_repository: Some(model_repository.into()),
            ..Self::single(id, model_name)
        }
    }

    /// Runtime unit names for every role, in launch order.
    #[must_use]
    pub fn unit_names(&self) -> Vec<String> {
        self.kind
            .roles()
            .iter()
            .map(|role| role.unit_name(&self.id))
            .collect()
    }
}
