//! Logging configuration and initialization.

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Level after applying `-v` / `-q` flags.
    #[must_use]
    pub fn effective_level(&self, verbose: u8, quiet: bool) -> &str {
        if quiet {
            return "error";
        }
        match verbose {
            0 => &self.level,
            1 => "debug",
            _ => "trace",
        }
    }

    /// Initialize the tracing subscriber on stderr.
    ///
    /// `RUST_LOG` takes precedence over the configured level and the
    /// verbosity flags.
    pub fn init(&self, verbose: u8, quiet: bool) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.effective_level(verbose, quiet)));

        match self.format.as_str() {
            "json" => {
                fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            _ => {
                fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}
