//! # Telemetry Module
//!
//! Reports sensor readings to the console and, optionally, to JSONL files.
//!
//! This module handles:
//! - Formatting console lines in the layout the dashboard scripts parse
//! - Writing timestamped JSON Lines records
//! - Forwarding fault diagnostics to every sink

pub mod console;
pub mod jsonl;

use serde::Serialize;

use crate::error::Result;
use crate::gas::model::GasReading;

/// One reading produced by a poll
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryRecord {
    /// Thermocouple temperature
    Temperature { celsius: f64 },

    /// Gas read path result
    Gas(GasReading),

    /// GNSS ground speed
    GroundSpeed { mm_per_s: i32, km_per_h: i32 },
}

/// Destination for telemetry
pub trait TelemetrySink {
    /// Report one reading
    fn record(&mut self, record: &TelemetryRecord) -> Result<()>;

    /// Report a human-readable diagnostic (faults, warnings)
    fn diagnostic(&mut self, message: &str) -> Result<()>;
}
