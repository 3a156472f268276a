//! # H2 Sensor Node
//!
//! Polls the thermocouple, MQ-8 gas sensor and u-blox GNSS receiver of a
//! hydrogen vehicle and reports readings to the console and JSONL logs.

use anyhow::{Context, Result};
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

mod config;
mod error;
mod gas;
mod gnss;
mod node;
mod sensors;
mod serial;
mod telemetry;
mod ubx;

use config::Config;
use gnss::GnssReceiver;
use node::{NodeState, NodeTiming, SensorNode};
use sensors::iio::IioAdcChannel;
use sensors::max6675::Max6675;
use sensors::mq8::Mq8;
use serial::DEFAULT_DEVICE_PATHS;
use telemetry::console::ConsoleSink;
use telemetry::jsonl::JsonlSink;

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Serial devices to try for the receiver
fn gnss_paths(config: &Config) -> Vec<&str> {
    if config.gnss.port.is_empty() {
        DEFAULT_DEVICE_PATHS.to_vec()
    } else {
        vec![config.gnss.port.as_str()]
    }
}

fn node_timing(config: &Config) -> NodeTiming {
    NodeTiming {
        startup_delay: Duration::from_millis(config.poller.startup_delay_ms),
        settle: Duration::from_millis(config.thermocouple.settle_ms),
        gnss_interval: Duration::from_millis(config.gnss.poll_interval_ms),
    }
}

/// Main entry point for the H2 sensor node
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (first argument, or `config/default.toml`)
///    - Open sensors and the GNSS serial port
///    - Calibrate the gas sensor, configure and aid the receiver
///
/// 2. **Main Loop**
///    - Poll all sensors every `poller.period_ms`
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Halt**
///    - On a calibration fault or missing receiver, report the fault and
///      wait for Ctrl+C without touching any sensor
///
/// # Errors
///
/// Returns error if:
/// - Configuration cannot be loaded
/// - No GNSS serial device can be opened
/// - The gas sensor ADC cannot be read during calibration
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("H2 Sensor Node v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    info!("Loaded configuration from {}", config_path);

    let thermocouple = Max6675::new(&config.thermocouple.device_dir);
    let gas = Mq8::new(IioAdcChannel::new(&config.gas.adc_path), config.gas.divider());

    let mut node = SensorNode::new(thermocouple, gas, config.gas.model(), config.gas.clean_air_ratio)
        .with_timing(node_timing(&config));

    if config.gnss.enabled {
        let (port, path) = serial::open_with_paths(&gnss_paths(&config), config.gnss.baud_rate)?;
        info!("GNSS serial port opened at: {}", path);

        let receiver = GnssReceiver::new(
            port,
            config.gnss.port_id,
            Duration::from_millis(config.gnss.timeout_ms),
        );
        let aiding = config.aiding.enabled.then(|| config.aiding.fix());
        node = node.with_gnss(receiver, aiding);
    } else {
        warn!("GNSS disabled in configuration");
    }

    if config.telemetry.console {
        node = node.with_sink(Box::new(ConsoleSink::stdout()));
    }
    if config.telemetry.jsonl_enabled {
        std::fs::create_dir_all(&config.telemetry.log_dir)
            .with_context(|| format!("Failed to create {}", config.telemetry.log_dir))?;
        node = node.with_sink(Box::new(JsonlSink::daily(&config.telemetry.log_dir)));
        info!("Writing JSONL telemetry to {}", config.telemetry.log_dir);
    }

    if let NodeState::Halted(fault) = node.initialize().await? {
        error!("Sensor node halted: {}. Power-cycle after fixing the fault.", fault);
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down...");
        return Ok(());
    }

    let mut poll_interval = interval(Duration::from_millis(config.poller.period_ms));
    info!("Polling sensors every {} ms", config.poller.period_ms);

    let mut poll_count: u64 = 0;

    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                if let Err(e) = node.poll().await {
                    error!("Poll failed: {}", e);
                    break;
                }
                poll_count += 1;
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total polls: {}", poll_count);
                break;
            }
        }
    }

    Ok(())
}
