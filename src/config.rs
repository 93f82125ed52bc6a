//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Read timeout bounding each command round-trip
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Settle delay between the close and reopen halves of a reset
    #[serde(default = "default_reset_settle_ms")]
    pub reset_settle_ms: u64,

    /// Upper bound on bytes collected per response
    #[serde(default = "default_response_limit")]
    pub response_limit: usize,
}

/// GPS telemetry stream configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_host")]
    pub host: String,

    #[serde(default = "default_telemetry_port")]
    pub port: u16,

    /// Extra chunk reads allowed when a chunk carries no positional
    /// sentence. 0 keeps the first miss fatal.
    #[serde(default)]
    pub fix_retry_limit: u32,
}

/// Test run configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    #[serde(default = "default_packet_count")]
    pub packet_count: u32,

    /// Gap between packet cycles. The default satisfies the EU 1% duty
    /// cycle limit at SF12; use 900 for the 0.1% class.
    #[serde(default = "default_pacing_secs")]
    pub pacing_secs: u64,

    /// Delay after an uplink send, letting the device finish the air
    /// round-trip before the RSSI query
    #[serde(default = "default_tx_settle_ms")]
    pub tx_settle_ms: u64,

    #[serde(default = "default_join_poll_attempts")]
    pub join_poll_attempts: u32,

    #[serde(default = "default_join_poll_interval_ms")]
    pub join_poll_interval_ms: u64,
}

/// Record log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115_200 }
fn default_timeout_ms() -> u64 { 2000 }
fn default_reset_settle_ms() -> u64 { 2000 }
fn default_response_limit() -> usize { 256 }

fn default_telemetry_host() -> String { "localhost".to_string() }
fn default_telemetry_port() -> u16 { 20175 }

fn default_packet_count() -> u32 { 10 }
fn default_pacing_secs() -> u64 { 120 }
fn default_tx_settle_ms() -> u64 { 2000 }
fn default_join_poll_attempts() -> u32 { 5 }
fn default_join_poll_interval_ms() -> u64 { 2000 }

fn default_log_dir() -> String { "./logs".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            reset_settle_ms: default_reset_settle_ms(),
            response_limit: default_response_limit(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            host: default_telemetry_host(),
            port: default_telemetry_port(),
            fix_retry_limit: 0,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            packet_count: default_packet_count(),
            pacing_secs: default_pacing_secs(),
            tx_settle_ms: default_tx_settle_ms(),
            join_poll_attempts: default_join_poll_attempts(),
            join_poll_interval_ms: default_join_poll_interval_ms(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { dir: default_log_dir() }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to the built-in
    /// defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("serial port cannot be empty")
            ));
        }

        // Rates the end device's AT firmware accepts
        if ![9600, 19200, 38400, 57600, 115200].contains(&self.serial.baud_rate) {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("baud_rate must be one of: 9600, 19200, 38400, 57600, 115200")
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("timeout_ms must be between 1 and 10000")
            ));
        }

        if self.serial.reset_settle_ms > 10000 {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("reset_settle_ms must be at most 10000")
            ));
        }

        if self.serial.response_limit == 0 || self.serial.response_limit > 4096 {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("response_limit must be between 1 and 4096")
            ));
        }

        if self.telemetry.host.is_empty() {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("telemetry host cannot be empty")
            ));
        }

        if self.telemetry.port == 0 {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("telemetry port cannot be 0")
            ));
        }

        if self.run.packet_count == 0 {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("packet_count must be greater than 0")
            ));
        }

        // pacing_secs 0 is allowed for bench testing

        if self.run.tx_settle_ms > 10000 {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("tx_settle_ms must be at most 10000")
            ));
        }

        if self.run.join_poll_attempts == 0 {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("join_poll_attempts must be greater than 0")
            ));
        }

        if self.run.join_poll_interval_ms > 60000 {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("join_poll_interval_ms must be at most 60000")
            ));
        }

        if self.log.dir.is_empty() {
            return Err(crate::error::SurveyError::Config(
                toml::de::Error::custom("log dir cannot be empty")
            ));
        }

        Ok(())
    }
}
