//! Configuration for an inspector session
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (inspector.toml)
//! - Environment variables (INSPECTOR_*)
//!
//! ## Example config file (inspector.toml):
//! ```toml
//! [connection]
//! endpoint = "http://127.0.0.1:15702"
//! request_timeout_secs = 5
//!
//! [cache]
//! refresh_on_mutation = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for an inspector session
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InspectorConfig {
    /// Remote endpoint settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Cache behavior
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Remote endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Endpoint the transport connects to
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

/// Cache behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Refetch a target's detail after a mutation is acknowledged
    #[serde(default = "default_true")]
    pub refresh_on_mutation: bool,

    /// How long the host waits between tree refreshes, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

// Default value functions
fn default_endpoint() -> String {
    "http://127.0.0.1:15702".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_on_mutation: true,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl InspectorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["inspector.toml", ".inspector.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "remote", "inspector") {
            let xdg_config = config_dir.config_dir().join("inspector.toml");
            if let Some(path) = xdg_config.to_str() {
                builder = builder.add_source(File::with_name(path).required(false));
            }
        }

        // Explicit path wins over the defaults
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix("INSPECTOR").separator("__"));

        builder.build()?.try_deserialize()
    }
}
