//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{Result, SensorNodeError};
use crate::gas::model::PowerLawModel;
use crate::sensors::mq8::DividerParams;
use crate::ubx::aiding::{AidingFix, AidingTime};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub gnss: GnssConfig,
    #[serde(default)]
    pub aiding: AidingConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub thermocouple: ThermocoupleConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// GNSS receiver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GnssConfig {
    #[serde(default = "default_gnss_enabled")]
    pub enabled: bool,

    /// Serial device; empty means auto-detect
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_gnss_baud_rate")]
    pub baud_rate: u32,

    /// Receiver-side port number (1 = UART1)
    #[serde(default = "default_gnss_port_id")]
    pub port_id: u8,

    #[serde(default = "default_gnss_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_gnss_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Position/time aiding configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AidingConfig {
    #[serde(default = "default_aiding_enabled")]
    pub enabled: bool,

    #[serde(default = "default_latitude_deg")]
    pub latitude_deg: f64,

    #[serde(default = "default_longitude_deg")]
    pub longitude_deg: f64,

    #[serde(default = "default_altitude_m")]
    pub altitude_m: f64,

    #[serde(default = "default_year")]
    pub year: u16,

    #[serde(default = "default_month")]
    pub month: u8,

    #[serde(default = "default_day")]
    pub day: u8,

    #[serde(default = "default_hour")]
    pub hour: u8,

    #[serde(default)]
    pub minute: u8,

    #[serde(default)]
    pub second: u8,
}

/// MQ-8 gas sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GasConfig {
    /// IIO raw ADC attribute of the sensor's analog channel
    #[serde(default = "default_adc_path")]
    pub adc_path: String,

    #[serde(default = "default_voltage_resolution")]
    pub voltage_resolution: f64,

    #[serde(default = "default_adc_bit_resolution")]
    pub adc_bit_resolution: u8,

    #[serde(default = "default_load_resistance_kohm")]
    pub load_resistance_kohm: f64,

    /// RS/R0 in clean air
    #[serde(default = "default_clean_air_ratio")]
    pub clean_air_ratio: f64,

    #[serde(default = "default_regression_a")]
    pub a: f64,

    #[serde(default = "default_regression_b")]
    pub b: f64,
}

/// Thermocouple configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ThermocoupleConfig {
    /// IIO device directory of the MAX6675
    #[serde(default = "default_thermocouple_dir")]
    pub device_dir: String,

    /// Wait after power-up before the first conversion
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Polling loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,

    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

/// Telemetry output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_console")]
    pub console: bool,

    #[serde(default)]
    pub jsonl_enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

// Default value functions
fn default_gnss_enabled() -> bool { true }
fn default_gnss_baud_rate() -> u32 { 38400 }
fn default_gnss_port_id() -> u8 { 1 }
fn default_gnss_timeout_ms() -> u64 { 1100 }
fn default_gnss_poll_interval_ms() -> u64 { 1000 }

fn default_aiding_enabled() -> bool { true }
fn default_latitude_deg() -> f64 { 41.0082 }
fn default_longitude_deg() -> f64 { 28.9784 }
fn default_altitude_m() -> f64 { 50.0 }
fn default_year() -> u16 { 2025 }
fn default_month() -> u8 { 6 }
fn default_day() -> u8 { 30 }
fn default_hour() -> u8 { 12 }

fn default_adc_path() -> String { "/sys/bus/iio/devices/iio:device0/in_voltage0_raw".to_string() }
fn default_voltage_resolution() -> f64 { 5.0 }
fn default_adc_bit_resolution() -> u8 { 10 }
fn default_load_resistance_kohm() -> f64 { 10.0 }
fn default_clean_air_ratio() -> f64 { 70.0 }
fn default_regression_a() -> f64 { 976.97 }
fn default_regression_b() -> f64 { -0.688 }

fn default_thermocouple_dir() -> String { "/sys/bus/iio/devices/iio:device1".to_string() }
fn default_settle_ms() -> u64 { 5000 }

fn default_startup_delay_ms() -> u64 { 5000 }
fn default_period_ms() -> u64 { 5000 }

fn default_console() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }

impl Default for GnssConfig {
    fn default() -> Self {
        Self {
            enabled: default_gnss_enabled(),
            port: String::new(),
            baud_rate: default_gnss_baud_rate(),
            port_id: default_gnss_port_id(),
            timeout_ms: default_gnss_timeout_ms(),
            poll_interval_ms: default_gnss_poll_interval_ms(),
        }
    }
}

impl Default for AidingConfig {
    fn default() -> Self {
        Self {
            enabled: default_aiding_enabled(),
            latitude_deg: default_latitude_deg(),
            longitude_deg: default_longitude_deg(),
            altitude_m: default_altitude_m(),
            year: default_year(),
            month: default_month(),
            day: default_day(),
            hour: default_hour(),
            minute: 0,
            second: 0,
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            adc_path: default_adc_path(),
            voltage_resolution: default_voltage_resolution(),
            adc_bit_resolution: default_adc_bit_resolution(),
            load_resistance_kohm: default_load_resistance_kohm(),
            clean_air_ratio: default_clean_air_ratio(),
            a: default_regression_a(),
            b: default_regression_b(),
        }
    }
}

impl Default for ThermocoupleConfig {
    fn default() -> Self {
        Self {
            device_dir: default_thermocouple_dir(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: default_startup_delay_ms(),
            period_ms: default_period_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            console: default_console(),
            jsonl_enabled: false,
            log_dir: default_log_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gnss: GnssConfig::default(),
            aiding: AidingConfig::default(),
            gas: GasConfig::default(),
            thermocouple: ThermocoupleConfig::default(),
            poller: PollerConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AidingConfig {
    /// Aiding fix described by this section
    pub fn fix(&self) -> AidingFix {
        AidingFix {
            latitude_deg: self.latitude_deg,
            longitude_deg: self.longitude_deg,
            altitude_m: self.altitude_m,
            time: AidingTime {
                year: self.year,
                month: self.month,
                day: self.day,
                hour: self.hour,
                minute: self.minute,
                second: self.second,
            },
        }
    }
}

impl GasConfig {
    pub fn divider(&self) -> DividerParams {
        DividerParams {
            voltage_resolution: self.voltage_resolution,
            adc_bits: self.adc_bit_resolution,
            load_resistance_kohm: self.load_resistance_kohm,
        }
    }

    pub fn model(&self) -> PowerLawModel {
        PowerLawModel { a: self.a, b: self.b }
    }
}

fn invalid(message: impl std::fmt::Display) -> SensorNodeError {
    SensorNodeError::Config(toml::de::Error::custom(message))
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
    /// use h2_sensor_node::config::Config;
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

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // GNSS
        if ![9600, 38400, 115200].contains(&self.gnss.baud_rate) {
            return Err(invalid("gnss baud_rate must be one of: 9600, 38400, 115200"));
        }

        if self.gnss.timeout_ms == 0 || self.gnss.timeout_ms > 10000 {
            return Err(invalid("gnss timeout_ms must be between 1 and 10000"));
        }

        if self.gnss.poll_interval_ms < 1000 {
            return Err(invalid("gnss poll_interval_ms must be at least 1000"));
        }

        // Aiding
        if self.aiding.enabled {
            self.aiding
                .fix()
                .validate()
                .map_err(|e| invalid(format!("aiding: {}", e)))?;
        }

        // Gas sensor
        if self.gas.adc_path.is_empty() {
            return Err(invalid("gas adc_path cannot be empty"));
        }

        if !(self.gas.voltage_resolution > 0.0 && self.gas.voltage_resolution.is_finite()) {
            return Err(invalid("gas voltage_resolution must be a positive number"));
        }

        if self.gas.adc_bit_resolution == 0 || self.gas.adc_bit_resolution > 16 {
            return Err(invalid("gas adc_bit_resolution must be between 1 and 16"));
        }

        for (name, value) in [
            ("load_resistance_kohm", self.gas.load_resistance_kohm),
            ("clean_air_ratio", self.gas.clean_air_ratio),
            ("a", self.gas.a),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(invalid(format!("gas {} must be a positive number", name)));
            }
        }

        if !self.gas.b.is_finite() {
            return Err(invalid("gas b must be a finite number"));
        }

        // Thermocouple
        if self.thermocouple.device_dir.is_empty() {
            return Err(invalid("thermocouple device_dir cannot be empty"));
        }

        if self.thermocouple.settle_ms > 60000 {
            return Err(invalid("thermocouple settle_ms must be at most 60000"));
        }

        // Poller
        if self.poller.period_ms == 0 || self.poller.period_ms > 600000 {
            return Err(invalid("poller period_ms must be between 1 and 600000"));
        }

        if self.poller.startup_delay_ms > 60000 {
            return Err(invalid("poller startup_delay_ms must be at most 60000"));
        }

        // Telemetry
        if self.telemetry.jsonl_enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when jsonl is enabled"));
        }

        Ok(())
    }
}
