//! Command-line interface definitions.
//!
//! Defines the CLI structure for modelctl using `clap`. Environment
//! variables are read here, and only here, through `env` attributes.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::paths;
use crate::infrastructure::config::settings::Overrides;

/// Start, stop and inspect GPU model-inference instances on this host
#[derive(Parser, Debug)]
#[command(name = "modelctl")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the settings file (missing file means defaults).
    #[arg(
        long,
        global = true,
        env = "MODELCTL_SETTINGS",
        default_value_os_t = paths::default_settings()
    )]
    pub settings: PathBuf,

    /// Directory for instance records and locks.
    #[arg(long, global = true, env = "MODELCTL_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start (or restart) the instance for a model configuration
    Start(StartArgs),

    /// Stop the instance for a model configuration
    Stop(StopArgs),

    /// List instances known to the runtime and this host's records
    List(ListArgs),

    /// Open an interactive shell in the inference image
    Shell(ShellArgs),
}

/// Arguments for the `start` subcommand.
///
/// All optional fields override the corresponding settings file values.
#[derive(Parser, Debug)]
pub struct StartArgs {
    /// Model configuration file (YAML or JSON).
    pub config: PathBuf,

    /// Skip registry reconciliation.
    #[arg(long)]
    pub no_sync: bool,

    /// Readiness deadline in seconds.
    #[arg(long, value_name = "SECS")]
    pub health_timeout: Option<u64>,

    /// Host published in the registry endpoint.
    #[arg(long, env = "MODELCTL_ADVERTISE_HOST")]
    pub advertise_host: Option<String>,

    /// Adapter image for composite instances.
    #[arg(long, env = "MODELCTL_ADAPTER_IMAGE")]
    pub adapter_image: Option<String>,

    #[command(flatten)]
    pub image: ImageArgs,

    #[command(flatten)]
    pub placement: PlacementArgs,

    #[command(flatten)]
    pub credential: CredentialArgs,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// Arguments for the `stop` subcommand.
#[derive(Parser, Debug)]
pub struct StopArgs {
    /// Model configuration file the instance was started from.
    pub config: PathBuf,
}

/// Arguments for the `list` subcommand.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Render a table instead of JSON.
    #[arg(long)]
    pub table: bool,
}

/// Arguments for the `shell` subcommand.
#[derive(Parser, Debug)]
pub struct ShellArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    #[command(flatten)]
    pub placement: PlacementArgs,

    #[command(flatten)]
    pub credential: CredentialArgs,
}

/// Primary/server image override.
#[derive(Args, Debug, Default)]
pub struct ImageArgs {
    /// Image for primary and server units.
    #[arg(long, env = "MODELCTL_IMAGE")]
    pub image: Option<String>,
}

/// GPU selection and model cache location.
#[derive(Args, Debug, Default)]
pub struct PlacementArgs {
    /// `CUDA_VISIBLE_DEVICES` for compute units, e.g. `0,1`.
    #[arg(long, env = "MODELCTL_DEVICES", value_name = "IDS")]
    pub devices: Option<String>,

    /// Host cache root bound into compute units.
    #[arg(long, env = "MODELCTL_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Supplied instance credential.
#[derive(Args, Debug, Default)]
pub struct CredentialArgs {
    /// Use this credential instead of generating one.
    #[arg(long, env = "MODELCTL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Registry connection overrides.
#[derive(Args, Debug, Default)]
pub struct RegistryArgs {
    /// Registry base URL.
    #[arg(long, env = "MODELCTL_REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Registry management token.
    #[arg(long, env = "MODELCTL_REGISTRY_TOKEN", hide_env_values = true)]
    pub registry_token: Option<String>,
}

impl StartArgs {
    /// Settings overrides carried by these arguments.
    #[must_use]
    pub fn overrides(&self, state_dir: Option<PathBuf>) -> Overrides {
        Overrides {
            registry_url: self.registry.registry_url.clone(),
            registry_token: self.registry.registry_token.clone(),
            api_key: self.credential.api_key.clone(),
            image: self.image.image.clone(),
            adapter_image: self.adapter_image.clone(),
            devices: self.placement.devices.clone(),
            cache_dir: self.placement.cache_dir.clone(),
            state_dir,
            advertise_host: self.advertise_host.clone(),
            health_timeout_secs: self.health_timeout,
        }
    }
}

impl ShellArgs {
    #[must_use]
    pub fn overrides(&self, state_dir: Option<PathBuf>) -> Overrides {
        Overrides {
            api_key: self.credential.api_key.clone(),
            image: self.image.image.clone(),
            devices: self.placement.devices.clone(),
            cache_dir: self.placement.cache_dir.clone(),
            state_dir,
            ..Overrides::default()
        }
    }
}
