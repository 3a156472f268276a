//! # H2 Sensor Node Library
//!
//! Data acquisition for a hydrogen vehicle: engine temperature from a
//! MAX6675 thermocouple, hydrogen concentration from an MQ-8 gas sensor and
//! ground speed from a u-blox GNSS receiver.
//!
//! This library provides the UBX frame encoder and aiding payload builder,
//! the MQ-8 calibration engine and concentration model, and the node that
//! polls them all.

pub mod config;
pub mod error;
pub mod gas;
pub mod gnss;
pub mod node;
pub mod sensors;
pub mod serial;
pub mod telemetry;
pub mod ubx;
