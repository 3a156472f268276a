//! Console telemetry.
//!
//! Lines match what the dashboard scripts read off the serial console:
//!
//! ```text
//! C = 23.250
//! | Sensor Ratio (RS/R0): 1.00 | Hydrogen Estimate (ppm): 977
//! 12 km/h
//! ```

use std::io::{self, Write};

use super::{TelemetryRecord, TelemetrySink};
use crate::error::Result;

/// Format one record as a console line (without newline)
pub fn format_record(record: &TelemetryRecord) -> String {
    match record {
        TelemetryRecord::Temperature { celsius } => format!("C = {:.3}", celsius),
        TelemetryRecord::Gas(reading) => format!(
            "| Sensor Ratio (RS/R0): {:.2} | Hydrogen Estimate (ppm): {:.0}",
            reading.ratio, reading.ppm
        ),
        TelemetryRecord::GroundSpeed { km_per_h, .. } => format!("{} km/h", km_per_h),
    }
}

/// Line-oriented sink over any writer
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TelemetrySink for ConsoleSink<W> {
    fn record(&mut self, record: &TelemetryRecord) -> Result<()> {
        writeln!(self.out, "{}", format_record(record))?;
        self.out.flush()?;
        Ok(())
    }

    fn diagnostic(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "Warning: {}", message)?;
        self.out.flush()?;
        Ok(())
    }
}
