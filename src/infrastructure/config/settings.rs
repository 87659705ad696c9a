//! Application settings loading and validation.
//!
//! Provides the [`Settings`] struct that aggregates every tunable of the
//! orchestrator. Settings come from an optional TOML file; values taken from
//! the environment are read by the CLI and folded in through
//! [`Overrides`], so nothing below the CLI touches the environment.
//!
//! # Example
//!
//! ```no_run
//! use modelctl::infrastructure::config::settings::Settings;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load_or_default("config.toml")?;
//!     settings.init_logging(0, false);
//!     Ok(())
//! }
//! ```

use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::logging::LoggingConfig;
use crate::application::lifecycle::LaunchSettings;
use crate::domain::Mount;
use crate::error::{ConfigError, Result};

/// Container runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Runtime executable.
    pub binary: String,
    /// Image for primary and server units.
    pub image: Option<String>,
    /// Image for adapter units.
    pub adapter_image: Option<String>,
    /// Expose host GPUs to compute units.
    pub gpu: bool,
    /// `CUDA_VISIBLE_DEVICES` for compute units.
    pub devices: Option<String>,
    /// Host cache root bound into units.
    pub cache_dir: Option<PathBuf>,
    /// Extra `SRC:DST[:ro]` binds for compute units.
    pub extra_binds: Vec<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            binary: "apptainer".to_string(),
            image: None,
            adapter_image: None,
            gpu: true,
            devices: None,
            cache_dir: None,
            extra_binds: Vec::new(),
        }
    }
}

/// Port allocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortSettings {
    pub low: u16,
    pub high: u16,
    /// Connect timeout of one liveness probe.
    pub probe_timeout_ms: u64,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            low: 49152,
            high: 65535,
            probe_timeout_ms: 250,
        }
    }
}

/// Readiness polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub interval_secs: u64,
    pub timeout_secs: u64,
    /// Timeout of a single readiness request.
    pub request_timeout_ms: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            timeout_secs: 1800,
            request_timeout_ms: 2000,
        }
    }
}

/// Model registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Base URL of the registry service.
    pub url: Option<String>,
    /// Management token.
    pub token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            request_timeout_secs: 30,
        }
    }
}

/// Per-instance settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InstanceSettings {
    /// Host published in registry endpoints.
    pub advertise_host: String,
    /// Credential to use instead of generating one.
    pub api_key: Option<String>,
    /// Where records and locks live. Defaults to `~/.modelctl`.
    pub state_dir: Option<PathBuf>,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            advertise_host: "127.0.0.1".to_string(),
            api_key: None,
            state_dir: None,
        }
    }
}

/// Values supplied on the command line or through the environment.
///
/// `None` keeps the value from the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub registry_url: Option<String>,
    pub registry_token: Option<String>,
    pub api_key: Option<String>,
    pub image: Option<String>,
    pub adapter_image: Option<String>,
    pub devices: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub advertise_host: Option<String>,
    pub health_timeout_secs: Option<u64>,
}

/// Main application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub runtime: RuntimeSettings,
    #[serde(default)]
    pub ports: PortSettings,
    #[serde(default)]
    pub health: HealthSettings,
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub instance: InstanceSettings,
}

impl Settings {
    /// Parse and validate settings from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or fails
    /// validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_toml(&content)
    }

    /// Like [`load`](Self::load), but a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::parse_toml(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::ReadFile {
                path: path.to_path_buf(),
                source,
            }
            .into()),
        }
    }

    /// Fold command-line and environment values in, then re-validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the result fails validation.
    pub fn apply(&mut self, overrides: Overrides) -> Result<()> {
        fn set<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut self.registry.url, overrides.registry_url);
        set(&mut self.registry.token, overrides.registry_token);
        set(&mut self.instance.api_key, overrides.api_key);
        set(&mut self.runtime.image, overrides.image);
        set(&mut self.runtime.adapter_image, overrides.adapter_image);
        set(&mut self.runtime.devices, overrides.devices);
        set(&mut self.runtime.cache_dir, overrides.cache_dir);
        set(&mut self.instance.state_dir, overrides.state_dir);
        if let Some(host) = overrides.advertise_host {
            self.instance.advertise_host = host;
        }
        if let Some(secs) = overrides.health_timeout_secs {
            self.health.timeout_secs = secs;
        }
        self.validate()
    }

    /// Validate settings values.
    fn validate(&self) -> Result<()> {
        if self.ports.low < 1024 {
            return Err(ConfigError::InvalidValue {
                field: "ports.low",
                reason: "must be 1024 or greater".to_string(),
            }
            .into());
        }
        if self.ports.low > self.ports.high {
            return Err(ConfigError::InvalidValue {
                field: "ports.high",
                reason: "must be >= ports.low".to_string(),
            }
            .into());
        }
        if self.ports.probe_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ports.probe_timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.health.interval_secs == 0 || self.health.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "health",
                reason: "interval and request timeout must be greater than 0".to_string(),
            }
            .into());
        }
        if self.health.timeout_secs < self.health.interval_secs {
            return Err(ConfigError::InvalidValue {
                field: "health.timeout_secs",
                reason: "must be >= health.interval_secs".to_string(),
            }
            .into());
        }
        if self.registry.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "registry.request_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.instance.advertise_host.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "instance.advertise_host",
            }
            .into());
        }
        self.extra_binds()?;
        Ok(())
    }

    #[must_use]
    pub fn port_range(&self) -> RangeInclusive<u16> {
        self.ports.low..=self.ports.high
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.ports.probe_timeout_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.health.interval_secs)
    }

    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health.timeout_secs)
    }

    #[must_use]
    pub fn probe_request_timeout(&self) -> Duration {
        Duration::from_millis(self.health.request_timeout_ms)
    }

    #[must_use]
    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry.request_timeout_secs)
    }

    /// Parsed `runtime.extra_binds`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a bind that is not
    /// `SRC:DST` or `SRC:DST:ro`.
    pub fn extra_binds(&self) -> Result<Vec<Mount>> {
        self.runtime
            .extra_binds
            .iter()
            .map(String::as_str)
            .map(parse_bind)
            .collect()
    }

    /// Launch parameters for the lifecycle controller.
    ///
    /// # Errors
    ///
    /// Returns an error if an extra bind is malformed.
    pub fn launch_settings(&self) -> Result<LaunchSettings> {
        Ok(LaunchSettings {
            image: self.runtime.image.clone(),
            adapter_image: self.runtime.adapter_image.clone(),
            gpu: self.runtime.gpu,
            devices: self.runtime.devices.clone(),
            cache_dir: self.runtime.cache_dir.clone(),
            extra_binds: self.extra_binds()?,
            advertise_host: self.instance.advertise_host.clone(),
            api_key: self.instance.api_key.clone(),
            health_timeout: self.health_timeout(),
        })
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self, verbose: u8, quiet: bool) {
        self.logging.init(verbose, quiet);
    }
}

fn parse_bind(bind: &str) -> Result<Mount> {
    let invalid = || ConfigError::InvalidValue {
        field: "runtime.extra_binds",
        reason: format!("expected SRC:DST or SRC:DST:ro, got '{bind}'"),
    };
    let parts: Vec<&str> = bind.split(':').collect();
    let mount = match parts.as_slice() {
        [source, target] if !source.is_empty() && !target.is_empty() => {
            Mount::read_write(*source, *target)
        }
        [source, target, "ro"] if !source.is_empty() && !target.is_empty() => {
            Mount::read_only(*source, *target)
        }
        _ => return Err(invalid().into()),
    };
    Ok(mount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::parse_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port_range(), 49152..=65535);
        assert_eq!(settings.poll_interval(), Duration::from_secs(2));
        assert_eq!(settings.health_timeout(), Duration::from_secs(1800));
        assert_eq!(settings.runtime.binary, "apptainer");
        assert!(settings.runtime.gpu);
    }

    #[test]
    fn sections_parse() {
        let toml = r#"
            [logging]
            level = "debug"
            format = "json"

            [runtime]
            image = "/images/vllm.sif"
            adapter_image = "/images/adapter.sif"
            gpu = false
            devices = "0"
            cache_dir = "/scratch/cache"
            extra_binds = ["/data:/data:ro", "/tmp/work:/work"]

            [ports]
            low = 50000
            high = 50100

            [health]
            interval_secs = 1
            timeout_secs = 60

            [registry]
            url = "http://registry.local:3000"
            token = "mgmt"

            [instance]
            advertise_host = "10.0.0.5"
        "#;

        let settings = Settings::parse_toml(toml).unwrap();
        assert_eq!(settings.logging.format, "json");
        assert_eq!(settings.port_range(), 50000..=50100);
        assert_eq!(settings.registry.url.as_deref(), Some("http://registry.local:3000"));

        let launch = settings.launch_settings().unwrap();
        assert!(!launch.gpu);
        assert_eq!(launch.advertise_host, "10.0.0.5");
        assert_eq!(launch.health_timeout, Duration::from_secs(60));
        assert_eq!(
            launch.extra_binds,
            vec![
                Mount::read_only("/data", "/data"),
                Mount::read_write("/tmp/work", "/work")
            ]
        );
    }

    #[test]
    fn inverted_port_range_is_rejected() {
        let err = Settings::parse_toml("[ports]\nlow = 60000\nhigh = 50000\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "ports.high",
                ..
            })
        ));
    }

    #[test]
    fn privileged_ports_are_rejected() {
        assert!(Settings::parse_toml("[ports]\nlow = 80\nhigh = 90\n").is_err());
    }

    #[test]
    fn timeout_shorter_than_interval_is_rejected() {
        let err = Settings::parse_toml("[health]\ninterval_secs = 10\ntimeout_secs = 5\n")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "health.timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn malformed_bind_is_rejected() {
        assert!(Settings::parse_toml("[runtime]\nextra_binds = [\"/only-source\"]\n").is_err());
        assert!(Settings::parse_toml("[runtime]\nextra_binds = [\"/a:/b:rw\"]\n").is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let mut settings =
            Settings::parse_toml("[registry]\nurl = \"http://file\"\ntoken = \"file\"\n").unwrap();
        settings
            .apply(Overrides {
                registry_url: Some("http://flag".to_string()),
                api_key: Some("k".to_string()),
                health_timeout_secs: Some(30),
                ..Overrides::default()
            })
            .unwrap();

        assert_eq!(settings.registry.url.as_deref(), Some("http://flag"));
        assert_eq!(settings.registry.token.as_deref(), Some("file"));
        assert_eq!(settings.instance.api_key.as_deref(), Some("k"));
        assert_eq!(settings.health_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn placement_overrides_replace_file_values() {
        let mut settings =
            Settings::parse_toml("[runtime]\ndevices = \"0\"\ncache_dir = \"/file/cache\"\n")
                .unwrap();
        settings
            .apply(Overrides {
                devices: Some("0,1".to_string()),
                cache_dir: Some(PathBuf::from("/scratch")),
                ..Overrides::default()
            })
            .unwrap();

        assert_eq!(settings.runtime.devices.as_deref(), Some("0,1"));
        assert_eq!(settings.runtime.cache_dir, Some(PathBuf::from("/scratch")));
    }

    #[test]
    fn override_is_validated() {
        let mut settings = Settings::default();
        let err = settings
            .apply(Overrides {
                health_timeout_secs: Some(0),
                ..Overrides::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn missing_file_gives_defaults_but_unreadable_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());

        assert!(matches!(
            Settings::load(dir.path().join("absent.toml")),
            Err(Error::Config(ConfigError::ReadFile { .. }))
        ));
    }
}
