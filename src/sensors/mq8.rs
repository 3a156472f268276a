//! MQ-8 hydrogen sensor on a resistive divider.
//!
//! The sensor's resistance RS is derived from the voltage across the load
//! resistor RL:
//!
//! ```text
//! V  = raw * Vref / (2^bits - 1)
//! RS = Vref * RL / V - RL          (clamped at 0)
//! ```
//!
//! A dead input (0 V) gives RS = +inf, a shorted sensor (full scale) gives
//! RS = 0; the calibration engine turns those into faults.

use tracing::trace;

use super::{AnalogInput, GasSensor};
use crate::error::Result;

/// Parameters of the analog front end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DividerParams {
    /// ADC reference voltage in volts
    pub voltage_resolution: f64,

    /// ADC resolution in bits
    pub adc_bits: u8,

    /// Load resistor in kΩ
    pub load_resistance_kohm: f64,
}

impl Default for DividerParams {
    fn default() -> Self {
        Self {
            voltage_resolution: 5.0,
            adc_bits: 10,
            load_resistance_kohm: 10.0,
        }
    }
}

impl DividerParams {
    /// Largest raw count the ADC produces
    pub fn full_scale(&self) -> f64 {
        ((1u32 << self.adc_bits) - 1) as f64
    }
}

/// MQ-8 driver over any analog input
#[derive(Debug)]
pub struct Mq8<A: AnalogInput> {
    input: A,
    params: DividerParams,
    sensor_volts: f64,
}

impl<A: AnalogInput> Mq8<A> {
    pub fn new(input: A, params: DividerParams) -> Self {
        Self {
            input,
            params,
            sensor_volts: 0.0,
        }
    }

    /// Divider voltage of the last sample
    pub fn sensor_volts(&self) -> f64 {
        self.sensor_volts
    }
}

impl<A: AnalogInput> GasSensor for Mq8<A> {
    fn update(&mut self) -> Result<()> {
        let raw = self.input.read_raw()?;
        self.sensor_volts = raw as f64 * self.params.voltage_resolution / self.params.full_scale();
        trace!("MQ-8 raw={} volts={:.4}", raw, self.sensor_volts);
        Ok(())
    }

    fn resistance(&self) -> f64 {
        let rl = self.params.load_resistance_kohm;
        let rs = (self.params.voltage_resolution * rl / self.sensor_volts) - rl;
        rs.max(0.0)
    }

    fn calibration_ratio(&self, clean_air_ratio: f64) -> f64 {
        (self.resistance() / clean_air_ratio).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::MockAnalogInput;

    fn sensor_reading(raw: u32) -> Mq8<MockAnalogInput> {
        let mut input = MockAnalogInput::new();
        input.expect_read_raw().returning(move || Ok(raw));
        let mut mq8 = Mq8::new(input, DividerParams::default());
        mq8.update().unwrap();
        mq8
    }

    #[test]
    fn test_default_params() {
        let params = DividerParams::default();
        assert_eq!(params.voltage_resolution, 5.0);
        assert_eq!(params.adc_bits, 10);
        assert_eq!(params.full_scale(), 1023.0);
    }

    #[test]
    fn test_mid_scale_resistance_equals_load() {
        // V = Vref/2  =>  RS = 2*RL - RL = RL
        let mut input = MockAnalogInput::new();
        input.expect_read_raw().returning(|| Ok(512));
        let params = DividerParams {
            voltage_resolution: 5.0,
            adc_bits: 10,
            load_resistance_kohm: 10.0,
        };
        let mut mq8 = Mq8::new(input, params);
        mq8.update().unwrap();

        let expected = 5.0 * 10.0 / (512.0 * 5.0 / 1023.0) - 10.0;
        assert!((mq8.resistance() - expected).abs() < 1e-9);
        assert!((mq8.resistance() - 10.0).abs() < 0.05);
    }

    #[test]
    fn test_zero_volts_is_infinite_resistance() {
        let mq8 = sensor_reading(0);
        assert_eq!(mq8.sensor_volts(), 0.0);
        assert!(mq8.resistance().is_infinite());
        assert!(mq8.calibration_ratio(70.0).is_infinite());
    }

    #[test]
    fn test_full_scale_is_zero_resistance() {
        let mq8 = sensor_reading(1023);
        assert_eq!(mq8.resistance(), 0.0);
        assert_eq!(mq8.calibration_ratio(70.0), 0.0);
    }

    #[test]
    fn test_calibration_ratio_divides_by_clean_air_ratio() {
        let mq8 = sensor_reading(100);
        let rs = mq8.resistance();
        assert!((mq8.calibration_ratio(70.0) - rs / 70.0).abs() < 1e-12);
    }

    #[test]
    fn test_update_propagates_read_error() {
        let mut input = MockAnalogInput::new();
        input
            .expect_read_raw()
            .returning(|| Err(crate::error::SensorNodeError::Sensor("adc gone".to_string())));
        let mut mq8 = Mq8::new(input, DividerParams::default());
        assert!(mq8.update().is_err());
    }
}
