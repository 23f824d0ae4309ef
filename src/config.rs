// src/config.rs
//
// Device configuration surface.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::io::error::AcquireError;

/// EEG device configuration.
///
/// Only the port is required; everything else has headset-appropriate
/// defaults and can be overridden field by field or loaded from TOML.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EegConfig {
    /// Serial port path (e.g. "/dev/cu.usbserial-1101", "COM3")
    pub port: String,
    /// Serial baud rate (ThinkGear modules ship at 57600)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Raw sample rate in Hz; with `buffer_secs` this sets the rolling
    /// buffer capacity
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: u32,
    /// Seconds of raw samples to retain
    #[serde(default = "default_buffer_secs")]
    pub buffer_secs: u32,
    /// Budget for one decode attempt, in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Sleep between background-mode iterations, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_baud_rate() -> u32 {
    57_600
}
fn default_sample_rate_hz() -> u32 {
    512
}
fn default_buffer_secs() -> u32 {
    5
}
fn default_read_timeout_ms() -> u64 {
    2_000
}
fn default_poll_interval_ms() -> u64 {
    3
}

impl EegConfig {
    /// Configuration for `port` with default protocol parameters.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: default_baud_rate(),
            sample_rate_hz: default_sample_rate_hz(),
            buffer_secs: default_buffer_secs(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    /// Rolling-buffer capacity in samples.
    pub fn buffer_capacity(&self) -> usize {
        (self.sample_rate_hz as usize * self.buffer_secs as usize).max(1)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parse a TOML configuration document.
    pub fn from_toml_str(raw: &str) -> Result<Self, AcquireError> {
        toml::from_str(raw).map_err(|e| AcquireError::configuration(format!("invalid config: {}", e)))
    }

    /// Load a TOML configuration file.
    pub fn from_toml_file(path: &Path) -> Result<Self, AcquireError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AcquireError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }
}
