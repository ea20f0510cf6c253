//! Configuration module
//!
//! Loaded from TOML (`~/.config/parking-dispatch/config.toml` by default).
//! Every section and field has a default, so an absent file or a partial one
//! is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub broker: BrokerConfig,
    pub machines: MachinesConfig,
    pub logging: LoggingConfig,
}

/// HTTP / WebSocket listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// NGSI-LD context broker holding the spot and garage entities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Base of the NGSI-LD API, e.g. `http://orion:1026/ngsi-ld/v1`
    pub base_url: String,
    /// Upper bound for every broker call
    pub request_timeout_secs: u64,
    /// Entities requested per page when listing
    pub page_size: usize,
    /// Entity type of parking spots
    pub spot_type: String,
    /// Optional JSON-LD `Link` header value sent with every request
    pub context_link: Option<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:1026/ngsi-ld/v1".to_string(),
            request_timeout_secs: 5,
            page_size: 100,
            spot_type: "SmartIndoorParkingSpot".to_string(),
            context_link: None,
        }
    }
}

/// Retrieval machine connections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinesConfig {
    /// Drop a machine that sent nothing for this long (0 = never)
    pub idle_timeout_secs: u64,
    /// How often the watchdog looks for idle machines
    pub sweep_interval_secs: u64,
}

impl MachinesConfig {
    /// How often each socket pings its machine. The pong refreshes activity,
    /// so a machine that only listens stays well inside the idle timeout.
    pub fn ping_interval(&self) -> Duration {
        let mut secs = self.sweep_interval_secs;
        if self.idle_timeout_secs > 0 {
            secs = secs.min(self.idle_timeout_secs / 2);
        }
        Duration::from_secs(secs.max(1))
    }
}

impl Default for MachinesConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 120,
            sweep_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Write the configuration, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `<config dir>/parking-dispatch/config.toml`, or `./config.toml` when the
/// platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("parking-dispatch").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}
