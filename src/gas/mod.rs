//! # Gas Module
//!
//! MQ-8 baseline calibration and hydrogen concentration estimation.
//!
//! This module handles:
//! - Averaging clean-air samples into the baseline resistance R0
//! - Detecting open- and short-circuit sensors during calibration
//! - The RS/R0 power-law concentration model

pub mod calibration;
pub mod model;
