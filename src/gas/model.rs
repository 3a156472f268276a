//! Power-law concentration model.
//!
//! `ppm = a * (RS/R0)^b`, with `a` and `b` fitted from the sensor datasheet
//! curve (MQ-8, H2: a = 976.97, b = -0.688).

use serde::Serialize;

use super::calibration::BaselineResistance;

/// Regression coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLawModel {
    pub a: f64,
    pub b: f64,
}

impl Default for PowerLawModel {
    fn default() -> Self {
        Self { a: 976.97, b: -0.688 }
    }
}

impl PowerLawModel {
    /// Concentration in ppm for a given RS/R0 ratio
    ///
    /// # Examples
    ///
    /// ```
    /// use h2_sensor_node::gas::model::PowerLawModel;
    ///
    /// let model = PowerLawModel::default();
    /// assert_eq!(model.concentration_ppm(1.0), 976.97);
    /// ```
    pub fn concentration_ppm(&self, ratio: f64) -> f64 {
        self.a * ratio.powf(self.b)
    }
}

/// One gas read-path result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GasReading {
    /// Sensor resistance RS in kΩ
    pub resistance: f64,
    /// RS/R0
    pub ratio: f64,
    /// Estimated concentration
    pub ppm: f64,
}

impl GasReading {
    /// Pure function of (RS, R0, a, b)
    pub fn compute(resistance: f64, r0: BaselineResistance, model: &PowerLawModel) -> Self {
        let ratio = resistance / r0.value();
        Self {
            resistance,
            ratio,
            ppm: model.concentration_ppm(ratio),
        }
    }
}
