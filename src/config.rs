//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{MspError, Result};

/// Environment variable that overrides `connection.port`
pub const PORT_ENV_VAR: &str = "MSP_PORT";

/// Baud rates accepted by Betaflight/INAV MSP ports
const VALID_BAUD_RATES: &[u32] = &[
    9600, 19200, 38400, 57600, 115200, 230400, 250000, 460800, 500000, 921600, 1000000,
];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Which link the flight controller is reached over
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Serial,
    Tcp,
}

/// Link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub kind: ConnectionKind,

    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_tcp_address")]
    pub tcp_address: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Protocol client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_enforce_response_match")]
    pub enforce_response_match: bool,
}

/// Telemetry recording configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_tcp_address() -> String { "192.168.4.1:23".to_string() }
fn default_timeout_ms() -> u64 { 1000 }

fn default_poll_interval_ms() -> u64 { 1000 }
fn default_enforce_response_match() -> bool { true }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            kind: ConnectionKind::default(),
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            tcp_address: default_tcp_address(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            enforce_response_match: default_enforce_response_match(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl ConnectionConfig {
    /// Per-read bound for every transport read
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Human-readable link target for log messages
    pub fn target(&self) -> &str {
        match self.kind {
            ConnectionKind::Serial => self.port.as_str(),
            ConnectionKind::Tcp => self.tcp_address.as_str(),
        }
    }
}

impl ClientConfig {
    /// Delay between poll ticks
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use msp_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings from the process environment
    ///
    /// `MSP_PORT` replaces the serial device path.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV_VAR).filter(|p| !p.is_empty()) {
            self.connection.port = port;
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        match self.connection.kind {
            ConnectionKind::Serial => {
                if self.connection.port.is_empty() {
                    return Err(invalid("serial port cannot be empty"));
                }

                if !VALID_BAUD_RATES.contains(&self.connection.baud_rate) {
                    return Err(invalid(format!(
                        "baud_rate must be one of: {:?}",
                        VALID_BAUD_RATES
                    )));
                }
            }
            ConnectionKind::Tcp => {
                if self.connection.tcp_address.parse::<SocketAddr>().is_err() {
                    return Err(invalid(format!(
                        "tcp_address '{}' is not a valid host:port socket address",
                        self.connection.tcp_address
                    )));
                }
            }
        }

        if self.connection.timeout_ms == 0 || self.connection.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.client.poll_interval_ms == 0 || self.client.poll_interval_ms > 60000 {
            return Err(invalid("poll_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(message: impl std::fmt::Display) -> MspError {
    MspError::Config(toml::de::Error::custom(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connection.kind, ConnectionKind::Serial);
        assert_eq!(config.connection.timeout(), Duration::from_secs(1));
        assert_eq!(config.client.poll_interval(), Duration::from_secs(1));
        assert!(config.client.enforce_response_match);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[connection]
port = "/dev/tty.usbmodem0001"
baud_rate = 57600
timeout_ms = 250

[client]
poll_interval_ms = 500
enforce_response_match = false

[telemetry]
enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.connection.port, "/dev/tty.usbmodem0001");
        assert_eq!(config.connection.baud_rate, 57600);
        assert_eq!(config.connection.timeout(), Duration::from_millis(250));
        assert_eq!(config.client.poll_interval_ms, 500);
        assert!(!config.client.enforce_response_match);
        assert!(!config.telemetry.enabled);
        assert_eq!(config.telemetry.max_files_to_keep, 10);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.connection.port, "/dev/ttyACM0");
        assert_eq!(config.connection.baud_rate, 115200);
    }

    #[test]
    fn test_load_tcp_config() {
        let config: Config = toml::from_str(
            r#"
[connection]
kind = "tcp"
tcp_address = "10.0.0.2:5760"
"#,
        )
        .unwrap();

        assert_eq!(config.connection.kind, ConnectionKind::Tcp);
        assert_eq!(config.connection.target(), "10.0.0.2:5760");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_connection_kind_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
[connection]
kind = "bluetooth"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/msp-telemetry.toml");
        assert!(matches!(result, Err(MspError::Io(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.connection.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_port_allowed_for_tcp() {
        let mut config = Config::default();
        config.connection.kind = ConnectionKind::Tcp;
        config.connection.port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_tcp_address() {
        let mut config = Config::default();
        config.connection.kind = ConnectionKind::Tcp;
        config.connection.tcp_address = "pluto.local".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.connection.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in VALID_BAUD_RATES {
            let mut config = Config::default();
            config.connection.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut config = Config::default();
        config.connection.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_too_high() {
        let mut config = Config::default();
        config.connection.timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_zero() {
        let mut config = Config::default();
        config.client.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_too_high() {
        let mut config = Config::default();
        config.client.poll_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = Config::default();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = Config::default();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_port_override() {
        let mut config = Config::default();
        config.apply_overrides(|name| {
            (name == PORT_ENV_VAR).then(|| "/dev/tty.usbmodem327F357730331".to_string())
        });
        assert_eq!(config.connection.port, "/dev/tty.usbmodem327F357730331");
    }

    #[test]
    fn test_bare_port_variable_ignored() {
        // PORT is commonly set for unrelated services
        let mut config = Config::default();
        config.apply_overrides(|name| (name == "PORT").then(|| "8080".to_string()));
        assert_eq!(config.connection.port, "/dev/ttyACM0");
    }

    #[test]
    fn test_empty_port_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.connection.port, "/dev/ttyACM0");
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyACM0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_tcp_address(), "192.168.4.1:23");
        assert_eq!(default_timeout_ms(), 1000);
        assert_eq!(default_poll_interval_ms(), 1000);
        assert_eq!(default_enforce_response_match(), true);
        assert_eq!(default_telemetry_enabled(), true);
        assert_eq!(default_log_dir(), "./logs");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
    }
}
