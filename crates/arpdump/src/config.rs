//! Configuration file support for arpdump
//!
//! Loads and validates arpdump defaults from a TOML file. Command-line flags
//! override anything set here.
//!
//! ```toml
//! [lookup]
//! resolve_hostnames = false
//!
//! [filter]
//! interface = "em0"
//!
//! [logging]
//! level = "warn"
//! ```

use crate::error::{ArpdumpError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Longest interface name the kernel accepts, excluding the NUL
const IFNAMSIZ_MAX: usize = 15;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Reverse lookup settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Resolve entry addresses to host names
    #[serde(default)]
    pub resolve_hostnames: bool,
}

/// Entry selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Only show entries on this interface
    #[serde(default)]
    pub interface: Option<String>,
}

/// Diagnostic output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Complete arpdump configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArpdumpConfig {
    #[serde(default)]
    pub lookup: LookupConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ArpdumpConfig {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ArpdumpError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ArpdumpError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content).map_err(|e| match e {
            ArpdumpError::Config(msg) => {
                ArpdumpError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.filter.interface {
            if name.is_empty() || name.len() > IFNAMSIZ_MAX {
                return Err(ArpdumpError::Config(format!(
                    "interface name must be 1-{} bytes, got {:?}",
                    IFNAMSIZ_MAX, name
                )));
            }
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ArpdumpError::Config(format!(
                "unknown log level {:?}",
                self.logging.level
            )));
        }

        Ok(())
    }
}
