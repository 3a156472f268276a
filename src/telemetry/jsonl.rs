//! JSON Lines telemetry log.
//!
//! One object per line: `{"timestamp": "...", "kind": "gas", ...}`. In
//! production the writer is a daily-rotated file from `tracing-appender`.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing_appender::rolling::{self, RollingFileAppender};

use super::{TelemetryRecord, TelemetrySink};
use crate::error::Result;

/// File name prefix for rotated telemetry logs
pub const TELEMETRY_FILE_PREFIX: &str = "telemetry.jsonl";

#[derive(Serialize)]
struct Entry<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a TelemetryRecord,
}

#[derive(Serialize)]
struct DiagnosticEntry<'a> {
    timestamp: DateTime<Utc>,
    kind: &'static str,
    message: &'a str,
}

/// JSONL sink over any writer
pub struct JsonlSink<W: Write> {
    out: W,
}

impl JsonlSink<RollingFileAppender> {
    /// Daily-rotated files in `log_dir`
    pub fn daily<P: AsRef<Path>>(log_dir: P) -> Self {
        Self::new(rolling::daily(log_dir, TELEMETRY_FILE_PREFIX))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> TelemetrySink for JsonlSink<W> {
    fn record(&mut self, record: &TelemetryRecord) -> Result<()> {
        self.write_line(&Entry {
            timestamp: Utc::now(),
            record,
        })
    }

    fn diagnostic(&mut self, message: &str) -> Result<()> {
        self.write_line(&DiagnosticEntry {
            timestamp: Utc::now(),
            kind: "diagnostic",
            message,
        })
    }
}
