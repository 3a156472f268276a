//! MAX6675 K-type thermocouple amplifier via the `maxim_thermocouple` IIO driver.
//!
//! The kernel driver reports the reading as `in_temp_raw` and
//! `in_temp_scale` (millidegrees Celsius per count). An open thermocouple
//! makes the raw read fail.

use std::path::{Path, PathBuf};

use super::iio::read_attribute;
use super::Thermocouple;
use crate::error::{Result, SensorNodeError};

const RAW_ATTRIBUTE: &str = "in_temp_raw";
const SCALE_ATTRIBUTE: &str = "in_temp_scale";

/// MAX6675 bound to one IIO device directory
#[derive(Debug, Clone)]
pub struct Max6675 {
    device_dir: PathBuf,
}

impl Max6675 {
    /// # Arguments
    ///
    /// * `device_dir` - IIO device directory, e.g. `/sys/bus/iio/devices/iio:device1`
    pub fn new<P: Into<PathBuf>>(device_dir: P) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }

    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }
}

impl Thermocouple for Max6675 {
    fn read_celsius(&mut self) -> Result<f64> {
        let raw: i64 = read_attribute(&self.device_dir.join(RAW_ATTRIBUTE)).map_err(|e| {
            SensorNodeError::Sensor(format!("Thermocouple open or unreadable: {}", e))
        })?;
        let scale: f64 = read_attribute(&self.device_dir.join(SCALE_ATTRIBUTE))?;

        Ok(raw as f64 * scale / 1000.0)
    }
}
