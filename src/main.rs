//! # LoRa Survey
//!
//! Field-survey a LoRaWAN end device over its AT command link.
//!
//! The tool joins the device to the network, transmits a sequence of
//! uplink test packets, measures the RSSI after each one, correlates every
//! transmission with a GPS fix pulled from a streaming telemetry bridge,
//! and appends the results to a per-run CSV file.

use anyhow::Result;
use chrono::Local;
use tracing::info;
use tracing_subscriber;

mod config;
mod error;
mod at;
mod device;
mod telemetry;
mod recorder;
mod runner;

use config::Config;
use device::DeviceLink;
use recorder::Recorder;
use runner::ControlLoop;
use telemetry::TelemetrySource;

/// Config file consulted when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the LoRa Survey runner
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (CLI argument, default file, or built-ins)
///    - Open the serial link to the end device
///    - Connect to the GPS telemetry bridge
///
/// 2. **Survey Run**
///    - Join the network and confirm via status polling
///    - One packet cycle per sequence id: fix, uplink, RSSI, record
///    - Duty-cycle pacing between cycles
///
/// 3. **Shutdown**
///    - On completion, fatal error, or Ctrl+C: close the transport and
///      telemetry connection before exiting
///
/// # Errors
///
/// Returns an error (non-zero exit code) on any fatal condition: the
/// serial port or telemetry bridge cannot be opened, the device response
/// protocol breaks down, the join never confirms, or transport recovery
/// fails. A Ctrl+C stop exits cleanly with code 0.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("LoRa Survey v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    let mut device = DeviceLink::from_config(&config.serial);
    device.open()?;
    info!("Device link open at {}", config.serial.port);

    let telemetry = TelemetrySource::connect(&config.telemetry).await?;

    let recorder = Recorder::new(&config.log, Local::now());
    info!("Run records will go to {}", recorder.path().display());

    let mut control = ControlLoop::new(device, telemetry, recorder, &config);

    info!("Press Ctrl+C to stop the run");
    let outcome = tokio::select! {
        result = control.run() => Some(result),

        // Handle Ctrl+C for graceful shutdown
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            None
        }
    };

    control.shutdown();

    match outcome {
        Some(Ok(summary)) => {
            info!(
                "Run complete: {} packets recorded to {}",
                summary.packets_sent,
                summary.log_path.display()
            );
        }
        Some(Err(e)) => return Err(e.into()),
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_builtin_config_satisfies_validation() {
        // the binary must be runnable with no config file at all
        let config = Config::load_or_default("/does/not/exist.toml").unwrap();
        assert!(config.validate().is_ok());
    }
}
