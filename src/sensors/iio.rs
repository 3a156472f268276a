//! Linux IIO sysfs attribute access.
//!
//! IIO drivers expose each channel as a text file holding one number, e.g.
//! `/sys/bus/iio/devices/iio:device0/in_voltage0_raw`.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::AnalogInput;
use crate::error::{Result, SensorNodeError};

/// Read and parse a single-value sysfs attribute
pub fn read_attribute<T: FromStr>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| SensorNodeError::Sensor(format!("Failed to read {}: {}", path.display(), e)))?;

    text.trim().parse::<T>().map_err(|_| {
        SensorNodeError::Sensor(format!(
            "Unparseable value {:?} in {}",
            text.trim(),
            path.display()
        ))
    })
}

/// One ADC channel exposed as an `in_voltageN_raw` attribute
#[derive(Debug, Clone)]
pub struct IioAdcChannel {
    path: PathBuf,
}

impl IioAdcChannel {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AnalogInput for IioAdcChannel {
    fn read_raw(&mut self) -> Result<u32> {
        read_attribute(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn attribute(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_raw_trims_newline() {
        let file = attribute("512\n");
        let mut channel = IioAdcChannel::new(file.path());
        assert_eq!(channel.read_raw().unwrap(), 512);
    }

    #[test]
    fn test_read_float_attribute() {
        let file = attribute("0.250000000\n");
        let scale: f64 = read_attribute(file.path()).unwrap();
        assert!((scale - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file_is_sensor_error() {
        let mut channel = IioAdcChannel::new("/sys/bus/iio/devices/iio:device99/in_voltage0_raw");
        assert!(matches!(channel.read_raw(), Err(SensorNodeError::Sensor(_))));
    }

    #[test]
    fn test_garbage_is_sensor_error() {
        let file = attribute("not a number\n");
        let result: Result<u32> = read_attribute(file.path());
        match result {
            Err(SensorNodeError::Sensor(msg)) => assert!(msg.contains("Unparseable")),
            other => panic!("Expected Sensor error, got: {:?}", other),
        }
    }
}
