//! Launch planning: per-role specs, ports and readiness checks.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::application::identity;
use crate::application::ports::PortAllocator;
use crate::domain::{Credential, InstanceDescriptor, LaunchSpec, Mount, Role};
use crate::error::{ConfigError, Result};
use crate::port::outbound::probe::HealthCheck;

use super::LaunchSettings;

/// Where the model descriptor appears inside a primary unit.
pub const CONFIG_TARGET: &str = "/config/model.yaml";
/// Where the model repository appears inside a server unit.
pub const MODELS_TARGET: &str = "/models";
/// Where the host cache appears inside units.
pub const CACHE_TARGET: &str = "/cache";

/// Host used for local readiness checks and server-to-adapter traffic.
const LOOPBACK: &str = "127.0.0.1";

/// One role, ready to launch.
#[derive(Debug, Clone)]
pub struct RolePlan {
    pub role: Role,
    pub port: u16,
    pub spec: LaunchSpec,
    pub checks: Vec<HealthCheck>,
}

/// Choose a distinct port for every role of `desc`.
///
/// The server role also needs `port + 1` free for its control plane; that
/// derived port is probed here and excluded from later roles.
pub(super) async fn allocate_ports(
    allocator: &PortAllocator,
    desc: &InstanceDescriptor,
) -> Result<BTreeMap<Role, u16>> {
    let mut taken = HashSet::new();
    let mut ports = BTreeMap::new();
    for &role in desc.kind.roles() {
        let port = match role {
            Role::Server => {
                let port = allocator.find_free_port_pair(&taken).await?;
                taken.insert(port + 1);
                port
            }
            Role::Primary | Role::Adapter => allocator.find_free_port_excluding(&taken).await?,
        };
        taken.insert(port);
        ports.insert(role, port);
    }
    Ok(ports)
}

/// Published inference endpoint for an instance.
#[must_use]
pub fn endpoint_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}/v1")
}

/// Build launch specs in role order.
///
/// # Errors
///
/// Returns [`ConfigError::MissingField`] when a required image is not
/// configured.
pub fn plan_roles(
    desc: &InstanceDescriptor,
    settings: &LaunchSettings,
    ports: &BTreeMap<Role, u16>,
    credential: &Credential,
) -> Result<Vec<RolePlan>> {
    let cache_dir = desc.cache_dir.clone().or_else(|| settings.cache_dir.clone());

    desc.kind
        .roles()
        .iter()
        .map(|&role| {
            let port = port_of(ports, role)?;
            let spec = match role {
                Role::Primary => primary_spec(desc, settings, cache_dir.as_ref(), port, credential)?,
                Role::Server => server_spec(desc, settings, cache_dir.as_ref(), port)?,
                Role::Adapter => {
                    let server_port = port_of(ports, Role::Server)?;
                    adapter_spec(desc, settings, server_port, port, credential)?
                }
            };
            Ok(RolePlan {
                role,
                port,
                spec,
                checks: checks_for(role, port, credential),
            })
        })
        .collect()
}

/// Fail early when an image a role of `desc` needs is not configured.
pub(super) fn check_images(desc: &InstanceDescriptor, settings: &LaunchSettings) -> Result<()> {
    for role in desc.kind.roles() {
        match role {
            Role::Primary | Role::Server => {
                required_image(settings.image.as_ref(), "runtime.image")?;
            }
            Role::Adapter => {
                required_image(settings.adapter_image.as_ref(), "runtime.adapter_image")?;
            }
        }
    }
    Ok(())
}

fn port_of(ports: &BTreeMap<Role, u16>, role: Role) -> Result<u16> {
    ports.get(&role).copied().ok_or_else(|| {
        ConfigError::InvalidValue {
            field: "ports",
            reason: format!("no port allocated for role {role}"),
        }
        .into()
    })
}

fn checks_for(role: Role, port: u16, credential: &Credential) -> Vec<HealthCheck> {
    match role {
        Role::Primary => vec![HealthCheck::new(format!("http://{LOOPBACK}:{port}/v1/models"))
            .with_token(credential.clone())],
        Role::Server => vec![HealthCheck::new(format!(
            "http://{LOOPBACK}:{port}/v2/health/ready"
        ))],
        Role::Adapter => vec![HealthCheck::new(format!("http://{LOOPBACK}:{port}/health"))],
    }
}

fn required_image(image: Option<&String>, field: &'static str) -> Result<String> {
    image
        .filter(|image| !image.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingField { field }.into())
}

fn common_env(settings: &LaunchSettings, cache_dir: Option<&PathBuf>) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    if let Some(devices) = &settings.devices {
        env.insert("CUDA_VISIBLE_DEVICES".to_string(), devices.clone());
    }
    if cache_dir.is_some() {
        env.insert("HF_HOME".to_string(), format!("{CACHE_TARGET}/huggingface"));
    }
    env
}

fn common_mounts(settings: &LaunchSettings, cache_dir: Option<&PathBuf>) -> Vec<Mount> {
    let mut mounts = Vec::new();
    if let Some(cache) = cache_dir {
        mounts.push(Mount::read_write(cache, CACHE_TARGET));
    }
    mounts.extend(settings.extra_binds.iter().cloned());
    mounts
}

fn primary_spec(
    desc: &InstanceDescriptor,
    settings: &LaunchSettings,
    cache_dir: Option<&PathBuf>,
    port: u16,
    credential: &Credential,
) -> Result<LaunchSpec> {
    let mut env = common_env(settings, cache_dir);
    env.insert("API_KEY".to_string(), credential.expose().to_string());
    env.insert("PORT".to_string(), port.to_string());

    let mut mounts = vec![Mount::read_only(
        identity::absolute(&desc.config_path),
        CONFIG_TARGET,
    )];
    mounts.extend(common_mounts(settings, cache_dir));

    Ok(LaunchSpec {
        unit: Role::Primary.unit_name(&desc.id),
        image: required_image(settings.image.as_ref(), "runtime.image")?,
        env,
        mounts,
        args: vec![
            "--config".to_string(),
            CONFIG_TARGET.to_string(),
            "--host".to_string(),
            "0.0.0.0".to_string(),
            "--port".to_string(),
            port.to_string(),
        ],
        gpu: settings.gpu,
    })
}

fn server_spec(
    desc: &InstanceDescriptor,
    settings: &LaunchSettings,
    cache_dir: Option<&PathBuf>,
    port: u16,
) -> Result<LaunchSpec> {
    let repository = desc
        .model_repository
        .as_ref()
        .ok_or(ConfigError::MissingField {
            field: "model_repository",
        })?;

    let mut mounts = vec![Mount::read_only(
        identity::absolute(repository),
        MODELS_TARGET,
    )];
    mounts.extend(common_mounts(settings, cache_dir));

    Ok(LaunchSpec {
        unit: Role::Server.unit_name(&desc.id),
        image: required_image(settings.image.as_ref(), "runtime.image")?,
        env: common_env(settings, cache_dir),
        mounts,
        args: vec![
            format!("--model-repository={MODELS_TARGET}"),
            format!("--http-port={port}"),
            format!("--grpc-port={}", port + 1),
            "--allow-metrics=false".to_string(),
        ],
        gpu: settings.gpu,
    })
}

fn adapter_spec(
    desc: &InstanceDescriptor,
    settings: &LaunchSettings,
    server_port: u16,
    port: u16,
    credential: &Credential,
) -> Result<LaunchSpec> {
    let env = BTreeMap::from([
        ("TRITON_URL".to_string(), format!("{LOOPBACK}:{server_port}")),
        ("MODEL_NAME".to_string(), desc.model_name.clone()),
        ("ADAPTER_PORT".to_string(), port.to_string()),
        ("API_KEY".to_string(), credential.expose().to_string()),
    ]);

    Ok(LaunchSpec {
        unit: Role::Adapter.unit_name(&desc.id),
        image: required_image(settings.adapter_image.as_ref(), "runtime.adapter_image")?,
        env,
        mounts: Vec::new(),
        args: Vec::new(),
        gpu: false,
    })
}
