//! # UBX Frame Decoder
//!
//! Decodes UBX frames received from the GNSS receiver (acknowledgements,
//! port configuration and navigation solutions).

use bytes::{Buf, BytesMut};

use super::checksum::ubx_checksum;
use super::protocol::*;
use crate::error::{Result, SensorNodeError};

/// Decode a complete UBX frame
///
/// # Arguments
///
/// * `frame` - Complete UBX frame bytes (sync, class, id, length, payload, checksum)
///
/// # Returns
///
/// * `Result<UbxFrame>` - Decoded frame, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short
/// - Sync bytes are incorrect
/// - Length field disagrees with the frame size
/// - Checksum check fails
pub fn decode_frame(frame: &[u8]) -> Result<UbxFrame> {
    if frame.len() < UBX_FRAME_OVERHEAD {
        return Err(SensorNodeError::Ubx("Frame too short".to_string()));
    }

    if frame[0] != UBX_SYNC_CHAR_1 || frame[1] != UBX_SYNC_CHAR_2 {
        return Err(SensorNodeError::Ubx(format!(
            "Invalid sync bytes: 0x{:02X} 0x{:02X}",
            frame[0], frame[1]
        )));
    }

    let length = u16::from_le_bytes([frame[4], frame[5]]) as usize;
    let expected = UBX_FRAME_OVERHEAD + length;
    if frame.len() != expected {
        return Err(SensorNodeError::Ubx(format!(
            "Frame size mismatch: expected {} bytes, got {}",
            expected,
            frame.len()
        )));
    }

    let received = [frame[expected - 2], frame[expected - 1]];
    let calculated = ubx_checksum(&frame[2..expected - 2]);
    if calculated != received {
        return Err(SensorNodeError::Ubx(format!(
            "Checksum mismatch: expected {:02X?}, got {:02X?}",
            calculated, received
        )));
    }

    UbxFrame::new(frame[2], frame[3], frame[UBX_HEADER_SIZE..expected - 2].to_vec())
}

/// Incremental parser for a raw receiver byte stream
///
/// Bytes are pushed as they arrive; complete frames are pulled out with
/// [`FrameParser::next_frame`]. Anything that is not a UBX frame (NMEA
/// sentences, line noise) is skipped by resynchronising on the sync bytes.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: BytesMut,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Extract the next frame from the buffer
    ///
    /// Returns `None` when more bytes are needed, `Some(Err(_))` when a
    /// candidate frame failed validation or declares a payload longer than
    /// [`UBX_MAX_RX_PAYLOAD_SIZE`] (its first sync byte is dropped so the
    /// next call resynchronises), and `Some(Ok(_))` for a valid frame.
    pub fn next_frame(&mut self) -> Option<Result<UbxFrame>> {
        self.skip_to_sync();

        if self.buffer.len() < UBX_HEADER_SIZE {
            return None;
        }

        let length = u16::from_le_bytes([self.buffer[4], self.buffer[5]]) as usize;
        if length > UBX_MAX_RX_PAYLOAD_SIZE {
            self.buffer.advance(1);
            return Some(Err(SensorNodeError::Ubx(format!(
                "Declared payload length {} exceeds {} bytes",
                length, UBX_MAX_RX_PAYLOAD_SIZE
            ))));
        }

        let total = UBX_FRAME_OVERHEAD + length;
        if self.buffer.len() < total {
            return None;
        }

        match decode_frame(&self.buffer[..total]) {
            Ok(frame) => {
                self.buffer.advance(total);
                Some(Ok(frame))
            }
            Err(e) => {
                self.buffer.advance(1);
                Some(Err(e))
            }
        }
    }

    /// Drop bytes until the buffer starts with `B5 62` (or a lone trailing `B5`)
    fn skip_to_sync(&mut self) {
        let mut start = 0;
        while start < self.buffer.len() {
            if self.buffer[start] == UBX_SYNC_CHAR_1 {
                match self.buffer.get(start + 1) {
                    Some(&UBX_SYNC_CHAR_2) | None => break,
                    Some(_) => {}
                }
            }
            start += 1;
        }
        self.buffer.advance(start);
    }
}

/// Decode an ACK-ACK / ACK-NAK frame
///
/// # Returns
///
/// * `Result<(bool, u8, u8)>` - (accepted, acknowledged class, acknowledged id)
pub fn decode_ack(frame: &UbxFrame) -> Result<(bool, u8, u8)> {
    if frame.class() != UBX_CLASS_ACK || (frame.id() != UBX_ACK_ACK && frame.id() != UBX_ACK_NAK) {
        return Err(SensorNodeError::Ubx(format!(
            "Not an acknowledgement: 0x{:02X} 0x{:02X}",
            frame.class(), frame.id()
        )));
    }

    if frame.payload().len() < 2 {
        return Err(SensorNodeError::Ubx(format!(
            "ACK payload too short: {} bytes",
            frame.payload().len()
        )));
    }

    Ok((frame.id() == UBX_ACK_ACK, frame.payload()[0], frame.payload()[1]))
}

/// Extract ground speed from a NAV-PVT payload
///
/// # Returns
///
/// * `Result<i32>` - Ground speed in millimeters per second
pub fn decode_ground_speed(payload: &[u8]) -> Result<i32> {
    if payload.len() < UBX_NAV_PVT_PAYLOAD_SIZE {
        return Err(SensorNodeError::Ubx(format!(
            "NAV-PVT payload too short: {} bytes",
            payload.len()
        )));
    }

    let offset = UBX_NAV_PVT_GSPEED_OFFSET;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&payload[offset..offset + 4]);
    Ok(i32::from_le_bytes(raw))
}

/// Rewrite the outProtoMask field of a CFG-PRT payload
///
/// # Errors
///
/// Returns error if the payload is not a single-port CFG-PRT block
pub fn with_output_protocols(port_config: &[u8], mask: u16) -> Result<Vec<u8>> {
    if port_config.len() != UBX_CFG_PRT_PAYLOAD_SIZE {
        return Err(SensorNodeError::Ubx(format!(
            "CFG-PRT payload must be {} bytes, got {}",
            UBX_CFG_PRT_PAYLOAD_SIZE,
            port_config.len()
        )));
    }

    let mut updated = port_config.to_vec();
    let offset = UBX_CFG_PRT_OUT_PROTO_OFFSET;
    updated[offset..offset + 2].copy_from_slice(&mask.to_le_bytes());
    Ok(updated)
}
