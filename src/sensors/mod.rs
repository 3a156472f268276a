//! # Sensors Module
//!
//! Narrow interfaces to the node's analog and thermocouple sensors, plus
//! drivers backed by the Linux IIO subsystem.
//!
//! This module handles:
//! - Reading raw ADC counts and thermocouple temperatures from sysfs
//! - Converting MQ-8 divider voltage into sensor resistance
//! - The calibration sample consumed by the gas calibration engine

pub mod iio;
pub mod max6675;
pub mod mq8;

use crate::error::Result;

/// Source of raw analog-to-digital converter counts
#[cfg_attr(test, mockall::automock)]
pub trait AnalogInput {
    /// Read one raw conversion
    fn read_raw(&mut self) -> Result<u32>;
}

/// Thermocouple amplifier
#[cfg_attr(test, mockall::automock)]
pub trait Thermocouple {
    /// Current hot-junction temperature in degrees Celsius
    ///
    /// # Errors
    ///
    /// Returns `Sensor` when the probe is disconnected or unreadable
    fn read_celsius(&mut self) -> Result<f64>;
}

/// Metal-oxide gas sensor on an analog divider
#[cfg_attr(test, mockall::automock)]
pub trait GasSensor {
    /// Take a fresh sample from the underlying input
    fn update(&mut self) -> Result<()>;

    /// Sensor resistance (RS) of the last sample, in kΩ
    fn resistance(&self) -> f64;

    /// One calibration sample for the last update: RS divided by the
    /// datasheet RS/R0 ratio in clean air
    fn calibration_ratio(&self, clean_air_ratio: f64) -> f64;
}
