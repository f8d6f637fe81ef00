//! Configuration for the Modbus gateway bridge.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use fieldgate_common::config::LoggingConfig;
use fieldgate_core::FailurePolicy;

use crate::gateway::GatewayTarget;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Devices to poll
    pub devices: Vec<DeviceConfig>,

    /// Capacity of the reading broadcast channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_channel_capacity() -> usize {
    1024
}

/// Configuration for a single Modbus device behind the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name (unique identifier)
    pub name: String,

    /// PLC host address (IP or hostname)
    pub plc_host: String,

    /// PLC TCP port (default: 502)
    #[serde(default = "default_plc_port")]
    pub plc_port: u16,

    /// Modbus slave/unit ID (1-247)
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,

    /// First register to read (0-based)
    #[serde(default)]
    pub starting_register: u16,

    /// Number of registers to read
    #[serde(default = "default_register_count")]
    pub register_count: u16,

    /// Gateway REST port; the base URL is derived from it unless `api_url` is set
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Full gateway base URL override (e.g. "http://gateway.local:3001")
    #[serde(default)]
    pub api_url: Option<String>,

    /// Polling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Gateway request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// What a polling task does after a retryable fetch failure
    #[serde(default)]
    pub on_error: FailurePolicy,
}

fn default_plc_port() -> u16 {
    502
}

fn default_slave_id() -> u8 {
    1
}

fn default_register_count() -> u16 {
    1
}

fn default_api_port() -> u16 {
    3001
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    10
}

impl DeviceConfig {
    /// Gateway base URL for this device.
    pub fn gateway_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", self.api_port))
    }

    /// Network coordinates handed to the gateway client.
    pub fn target(&self) -> GatewayTarget {
        GatewayTarget {
            api_url: self.gateway_url(),
            ip: self.plc_host.clone(),
            port: self.plc_port,
            slave_id: self.slave_id,
            starting_register: self.starting_register,
            register_count: self.register_count,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: BridgeConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::Validation(
                "At least one device must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for device in &self.devices {
            if device.name.is_empty() {
                return Err(ConfigError::Validation(
                    "Device name cannot be empty".to_string(),
                ));
            }

            if !names.insert(device.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate device name '{}'",
                    device.name
                )));
            }

            if device.slave_id == 0 || device.slave_id > 247 {
                return Err(ConfigError::Validation(format!(
                    "Device '{}': slave_id must be 1-247",
                    device.name
                )));
            }

            if device.register_count == 0 {
                return Err(ConfigError::Validation(format!(
                    "Device '{}': register_count must be at least 1",
                    device.name
                )));
            }
        }

        Ok(())
    }
}
