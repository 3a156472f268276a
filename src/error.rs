//! # Error Types
//!
//! Custom error types for the sensor node using `thiserror`.

use thiserror::Error;

use crate::gas::calibration::CalibrationFault;
use crate::node::Fault;

/// Main error type for the sensor node
#[derive(Debug, Error)]
pub enum SensorNodeError {
    /// UBX protocol errors (framing, checksum, short payloads)
    #[error("UBX protocol error: {0}")]
    Ubx(String),

    /// Payload does not fit the 16-bit UBX length field
    #[error("UBX payload of {len} bytes exceeds the 65535-byte length field")]
    PayloadTooLarge { len: usize },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Serial transport errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No GNSS serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// GNSS receiver did not answer at initialization
    #[error("GNSS receiver not detected: {0}")]
    DeviceAbsent(String),

    /// Receiver did not answer a poll in time
    #[error("Timed out waiting for UBX 0x{class:02X} 0x{id:02X}")]
    Timeout { class: u8, id: u8 },

    /// Receiver rejected a configuration message
    #[error("Receiver rejected UBX 0x{class:02X} 0x{id:02X} (ACK-NAK)")]
    Nak { class: u8, id: u8 },

    /// Sensor read errors
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Gas sensor calibration failed
    #[error("Calibration fault: {0}")]
    Calibration(CalibrationFault),

    /// Node is halted and refuses further work
    #[error("Node halted: {0}")]
    Halted(Fault),

    /// Node was polled before `initialize` completed
    #[error("Node is not initialized")]
    NotInitialized,

    /// Telemetry serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the sensor node
pub type Result<T> = std::result::Result<T, SensorNodeError>;
