//! Process settings for Mockingbird.

mod admin;

use crate::mock::{MockServerSettings, PortRange, DEFAULT_LOG_CAPACITY, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use admin::{AdminSettings, VariablesSettings};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Inclusive window scanned for a free listener port
    #[serde(default)]
    pub port_range: PortRange,
    /// Preferred port of configurations created by the server
    #[serde(default = "default_port")]
    pub default_port: u16,
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    /// JSON file backing the configuration store; in-memory when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub variables: VariablesSettings,
    /// Expand `{{$uuid}}` and other built-ins in response bodies
    #[serde(default)]
    pub resolve_dynamic_variables: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

fn default_stop_timeout_ms() -> u64 {
    5000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port_range: PortRange::default(),
            default_port: default_port(),
            bind_host: default_bind_host(),
            log_capacity: default_log_capacity(),
            stop_timeout_ms: default_stop_timeout_ms(),
            data_file: None,
            admin: AdminSettings::default(),
            variables: VariablesSettings::default(),
            resolve_dynamic_variables: false,
        }
    }
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let settings: Settings = serde_yaml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.port_range.start > self.port_range.end {
            anyhow::bail!(
                "Invalid portRange: start ({}) is greater than end ({})",
                self.port_range.start,
                self.port_range.end
            );
        }
        if self.log_capacity == 0 {
            anyhow::bail!("logCapacity must be at least 1");
        }
        if self.stop_timeout_ms == 0 {
            anyhow::bail!("stopTimeoutMs must be greater than 0");
        }
        Ok(())
    }

    /// Listener tunables derived from these settings
    pub fn mock_server_settings(&self) -> MockServerSettings {
        MockServerSettings {
            bind_host: self.bind_host.clone(),
            port_range: self.port_range,
            default_port: self.default_port,
            log_capacity: self.log_capacity,
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}
