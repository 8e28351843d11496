//! # MSP Telemetry
//!
//! Poll attitude and battery voltage from a Betaflight/INAV flight controller
//! over MSP and print them to the console.

use anyhow::{Context, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use msp_telemetry::client::MspClient;
use msp_telemetry::config::{Config, TelemetryConfig};
use msp_telemetry::msp::registry::Reading;
use msp_telemetry::serial;
use msp_telemetry::telemetry::TelemetryLogger;

/// Environment variable holding the configuration file path
const CONFIG_ENV_VAR: &str = "MSP_TELEMETRY_CONFIG";

/// Configuration file used when CONFIG_ENV_VAR is unset
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for MSP Telemetry
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (file, then `MSP_PORT` override)
///    - Set up logging to console and, with telemetry enabled, a daily log file
///    - Open the serial port or TCP socket to the flight controller
///
/// 2. **Main Loop**
///    - Request attitude and battery once per poll interval
///    - Print each reading and append it to the JSONL telemetry log
///    - Skip over corrupted or late frames
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C cancels the poll loop between ticks
///    - The connection is closed on every exit path
///
/// # Errors
///
/// Returns error if:
/// - Configuration is invalid
/// - The link cannot be opened
/// - The link is lost while polling
///
/// # Examples
///
/// ```bash
/// MSP_PORT=/dev/ttyACM0 cargo run --release
/// ```
///
/// Expected output:
/// ```text
/// INFO msp_telemetry: MSP Telemetry v0.1.0 starting...
/// INFO msp_telemetry::serial: Opened flight controller at /dev/ttyACM0 (115200 baud)
/// INFO msp_telemetry: Attitude: roll 10.0°, pitch -2.4°, yaw 10
/// INFO msp_telemetry: Battery: 12.3 V
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = init_logging(&config);

    info!("MSP Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));

    // Set up everything fallible before the link is opened
    let mut recorder = open_recorder(&config.telemetry)?;

    let transport = serial::open(&config.connection)
        .await
        .with_context(|| format!("Failed to connect to {}", config.connection.target()))?;

    let mut client = MspClient::with_config(transport, config.connection.timeout(), &config.client);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            ctrl_c.cancel();
        }
    });

    info!("Press Ctrl+C to exit");

    let summary = client
        .poll_loop(config.client.poll_interval(), cancel, |reading| {
            print_reading(reading);

            if let Some(recorder) = recorder.as_mut() {
                if let Err(e) = recorder.log(reading) {
                    warn!("Failed to record telemetry: {}", e);
                }
            }
        })
        .await?;

    info!(
        "Polled {} ticks: {} readings, {} failed requests",
        summary.ticks, summary.readings, summary.failures
    );

    Ok(())
}

/// Load configuration from file (or defaults) and apply environment overrides
fn load_config() -> Result<Config> {
    let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        Config::load(&path).with_context(|| format!("Failed to load {}", path))?
    } else {
        Config::default()
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Console logging, plus a daily rolling file when telemetry is recorded
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let console = tracing_subscriber::fmt::layer();

    if config.telemetry.enabled {
        let appender = tracing_appender::rolling::daily(&config.telemetry.log_dir, "msp-telemetry.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(file)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry().with(filter).with(console).init();
        None
    }
}

/// JSONL recorder, if telemetry recording is enabled
fn open_recorder(config: &TelemetryConfig) -> Result<Option<TelemetryLogger>> {
    if !config.enabled {
        return Ok(None);
    }

    let recorder = TelemetryLogger::new(config)
        .with_context(|| format!("Failed to create telemetry log in {}", config.log_dir))?;
    Ok(Some(recorder))
}

fn print_reading(reading: &Reading) {
    match reading {
        Reading::Attitude(attitude) => info!(
            "Attitude: roll {:.1}°, pitch {:.1}°, yaw {}",
            attitude.roll, attitude.pitch, attitude.yaw
        ),
        Reading::Battery(battery) => info!("Battery: {:.1} V", battery.voltage),
    }
}
