//! # Calibration Module
//!
//! Derives the clean-air baseline resistance (R0) of the gas sensor.
//!
//! ## State machine
//!
//! ```text
//! Sampling{0..N} --N samples--> Averaging --> Validating --+--> Ready(R0)
//!                                                          +--> Faulted(OpenCircuit | ShortCircuit)
//! ```
//!
//! Every `step` performs one transition. `Ready` and `Faulted` are terminal:
//! stepping them again changes nothing. A fault is fatal for the node, since
//! every later concentration would be computed against a meaningless R0.
//!
//! ## Usage
//!
//! ```
//! use h2_sensor_node::error::Result;
//! use h2_sensor_node::gas::calibration::{CalibrationEngine, CalibrationState};
//! use h2_sensor_node::sensors::GasSensor;
//!
//! /// Sensor sitting in clean air at RS = 70 kΩ
//! struct CleanAir;
//!
//! impl GasSensor for CleanAir {
//!     fn update(&mut self) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     fn resistance(&self) -> f64 {
//!         70.0
//!     }
//!
//!     fn calibration_ratio(&self, clean_air_ratio: f64) -> f64 {
//!         self.resistance() / clean_air_ratio
//!     }
//! }
//!
//! let mut engine = CalibrationEngine::new(70.0);
//! match engine.run(&mut CleanAir)? {
//!     CalibrationState::Ready(r0) => assert_eq!(r0.value(), 1.0),
//!     other => panic!("calibration failed: {:?}", other),
//! }
//! # Ok::<(), h2_sensor_node::error::SensorNodeError>(())
//! ```

use std::fmt;

use tracing::{debug, info};

use crate::error::Result;
use crate::sensors::GasSensor;

/// Number of samples averaged into R0
pub const CALIBRATION_SAMPLES: u32 = 10;

/// Electrical fault found while calibrating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationFault {
    /// R0 is infinite or NaN: the analog input sees no sensor
    OpenCircuit,
    /// R0 is zero: the analog input is shorted
    ShortCircuit,
}

impl fmt::Display for CalibrationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationFault::OpenCircuit => write!(
                f,
                "R0 is infinite (open circuit detected), check sensor wiring and supply"
            ),
            CalibrationFault::ShortCircuit => write!(
                f,
                "R0 is zero (analog input shorted to ground), check sensor wiring and supply"
            ),
        }
    }
}

/// Validated clean-air baseline resistance
///
/// Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineResistance(f64);

impl BaselineResistance {
    /// Classify a candidate R0
    ///
    /// # Errors
    ///
    /// Non-finite values are `OpenCircuit`; zero (or anything not above
    /// zero) is `ShortCircuit`.
    pub fn new(value: f64) -> std::result::Result<Self, CalibrationFault> {
        if !value.is_finite() {
            return Err(CalibrationFault::OpenCircuit);
        }
        if value <= 0.0 {
            return Err(CalibrationFault::ShortCircuit);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Calibration progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    /// Collecting samples; `count` taken so far, `sum` of their ratios
    Sampling { count: u32, sum: f64 },
    /// All samples taken
    Averaging { sum: f64 },
    /// Mean computed, not yet classified
    Validating { mean: f64 },
    /// Terminal success
    Ready(BaselineResistance),
    /// Terminal failure
    Faulted(CalibrationFault),
}

impl CalibrationState {
    /// True for `Ready` and `Faulted`
    pub fn is_terminal(&self) -> bool {
        matches!(self, CalibrationState::Ready(_) | CalibrationState::Faulted(_))
    }
}

/// Averages gas sensor samples into R0
#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    samples: u32,
    clean_air_ratio: f64,
    state: CalibrationState,
}

impl CalibrationEngine {
    /// Engine taking the standard 10 samples
    ///
    /// # Arguments
    ///
    /// * `clean_air_ratio` - Datasheet RS/R0 in clean air (70 for the MQ-8)
    pub fn new(clean_air_ratio: f64) -> Self {
        Self::with_samples(CALIBRATION_SAMPLES, clean_air_ratio)
    }

    /// Engine taking `samples` samples (at least one)
    pub fn with_samples(samples: u32, clean_air_ratio: f64) -> Self {
        Self {
            samples: samples.max(1),
            clean_air_ratio,
            state: CalibrationState::Sampling { count: 0, sum: 0.0 },
        }
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Perform one state transition
    ///
    /// In `Sampling` this updates the sensor once and accumulates one
    /// calibration ratio.
    ///
    /// # Errors
    ///
    /// Propagates sensor read errors; the state is left unchanged so the
    /// failed sample is not counted.
    pub fn step<S: GasSensor + ?Sized>(&mut self, sensor: &mut S) -> Result<&CalibrationState> {
        self.state = match self.state {
            CalibrationState::Sampling { count, sum } => {
                sensor.update()?;
                let sample = sensor.calibration_ratio(self.clean_air_ratio);
                let count = count + 1;
                let sum = sum + sample;
                debug!("Calibration sample {}/{}: {}", count, self.samples, sample);

                if count >= self.samples {
                    CalibrationState::Averaging { sum }
                } else {
                    CalibrationState::Sampling { count, sum }
                }
            }
            CalibrationState::Averaging { sum } => CalibrationState::Validating {
                mean: sum / self.samples as f64,
            },
            CalibrationState::Validating { mean } => match BaselineResistance::new(mean) {
                Ok(r0) => {
                    info!("Calibration done, R0 = {:.3} kΩ", r0.value());
                    CalibrationState::Ready(r0)
                }
                Err(fault) => CalibrationState::Faulted(fault),
            },
            terminal => terminal,
        };

        Ok(&self.state)
    }

    /// Step until a terminal state is reached
    pub fn run<S: GasSensor + ?Sized>(&mut self, sensor: &mut S) -> Result<CalibrationState> {
        while !self.state.is_terminal() {
            self.step(sensor)?;
        }
        Ok(self.state)
    }
}
