//! # Serial Communication Module
//!
//! Byte-sink for the GNSS receiver's UART.
//!
//! This module handles:
//! - Opening the receiver's serial port (8N1, no flow control)
//! - Delivering one UBX frame per write transaction
//! - Reading raw receiver output for the frame parser

pub mod port_trait;

use crate::error::{Result, SensorNodeError};
use crate::ubx::encoder::encode_frame;
use crate::ubx::protocol::UbxFrame;
use port_trait::{SerialPortIO, TokioSerialPort};
use tracing::{debug, info, warn};

/// Factory baud rate of u-blox M10 receivers
pub const UBX_DEFAULT_BAUD_RATE: u32 = 38_400;

/// Default GNSS device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // Receiver USB CDC port
    "/dev/ttyAMA0", // SBC on-board UART
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Open the first GNSS serial device that responds to open()
///
/// # Arguments
///
/// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
/// * `baud_rate` - Port speed
///
/// # Returns
///
/// * `Result<(TokioSerialPort, String)>` - Opened port and the path that worked
///
/// # Errors
///
/// Returns `SerialPortNotFound` listing every path tried if none opens
pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<(TokioSerialPort, String)> {
    for path in paths {
        debug!("Trying to open serial port: {}", path);

        match open_port(path, baud_rate) {
            Ok(port) => {
                info!("Opened GNSS serial device at {}", path);
                return Ok((TokioSerialPort::new(port), path.to_string()));
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path, e);
                continue;
            }
        }
    }

    Err(SensorNodeError::SerialPortNotFound(paths.join(", ")))
}

/// Open a specific serial port with UBX UART settings
fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    use tokio_serial::SerialPortBuilderExt;

    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| SensorNodeError::Serial(format!("Failed to open {}: {}", path, e)))?;

    Ok(port)
}

/// Send one UBX frame as a single transaction
///
/// The port is borrowed exclusively for the whole write + flush, so two
/// frames can never interleave on the wire. Failures are reported, never
/// retried.
///
/// # Examples
///
/// ```no_run
/// use h2_sensor_node::serial::{open_with_paths, send_frame, DEFAULT_DEVICE_PATHS, UBX_DEFAULT_BAUD_RATE};
/// use h2_sensor_node::ubx::protocol::{UbxFrame, UBX_CLASS_NAV, UBX_NAV_PVT};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let (mut port, _path) = open_with_paths(DEFAULT_DEVICE_PATHS, UBX_DEFAULT_BAUD_RATE)?;
///     send_frame(&mut port, &UbxFrame::poll(UBX_CLASS_NAV, UBX_NAV_PVT)).await?;
///     Ok(())
/// }
/// ```
pub async fn send_frame<P: SerialPortIO + ?Sized>(port: &mut P, frame: &UbxFrame) -> Result<()> {
    let bytes = encode_frame(frame)?;

    port.write_all(&bytes)
        .await
        .map_err(|e| SensorNodeError::Serial(format!("Failed to write frame: {}", e)))?;

    port.flush()
        .await
        .map_err(|e| SensorNodeError::Serial(format!("Failed to flush serial port: {}", e)))?;

    debug!(
        "Sent UBX 0x{:02X} 0x{:02X} ({} bytes)",
        frame.class(),
        frame.id(),
        bytes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use port_trait::mocks::MockSerialPort;
    use std::io;

    #[test]
    fn test_constants() {
        assert_eq!(UBX_DEFAULT_BAUD_RATE, 38_400);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyACM0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = open_with_paths(invalid_paths, UBX_DEFAULT_BAUD_RATE);

        match result {
            Err(SensorNodeError::SerialPortNotFound(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            Err(other) => panic!("Expected SerialPortNotFound error, got: {:?}", other),
            Ok(_) => panic!("Expected SerialPortNotFound error, got a port"),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result = open_with_paths(empty_paths, UBX_DEFAULT_BAUD_RATE);
        assert!(matches!(result, Err(SensorNodeError::SerialPortNotFound(_))));
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = open_port("/dev/nonexistent_serial_device_12345", UBX_DEFAULT_BAUD_RATE);

        match result {
            Err(SensorNodeError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            Err(other) => panic!("Expected Serial error, got: {:?}", other),
            Ok(_) => panic!("Expected Serial error, got a port"),
        }
    }

    #[tokio::test]
    async fn test_send_frame_is_one_transaction() {
        let mut port = MockSerialPort::new();
        let frame = UbxFrame::new(0x0B, 0x01, vec![0u8; 48]).unwrap();

        send_frame(&mut port, &frame).await.unwrap();

        let written = port.get_written_data();
        assert_eq!(written.len(), 1, "Frame should be written in one transaction");
        assert_eq!(written[0], encode_frame(&frame).unwrap());
    }

    #[tokio::test]
    async fn test_send_frame_write_error() {
        let mut port = MockSerialPort::new();
        port.set_write_error(io::ErrorKind::BrokenPipe);

        let result = send_frame(&mut port, &UbxFrame::poll(0x01, 0x07)).await;
        match result {
            Err(SensorNodeError::Serial(msg)) => assert!(msg.contains("Failed to write frame")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
        assert!(port.get_written_data().is_empty());
    }

    #[tokio::test]
    async fn test_send_frame_flush_error() {
        let mut port = MockSerialPort::new();
        port.set_flush_error(io::ErrorKind::TimedOut);

        let result = send_frame(&mut port, &UbxFrame::poll(0x01, 0x07)).await;
        match result {
            Err(SensorNodeError::Serial(msg)) => assert!(msg.contains("Failed to flush")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_send_poll_with_real_hardware() {
        match open_with_paths(DEFAULT_DEVICE_PATHS, UBX_DEFAULT_BAUD_RATE) {
            Ok((mut port, path)) => {
                let result = send_frame(&mut port, &UbxFrame::poll(0x01, 0x07)).await;
                assert!(result.is_ok(), "Failed to send poll to {}: {:?}", path, result);
            }
            Err(_) => println!("No GNSS hardware detected (skipping send test)"),
        }
    }
}
