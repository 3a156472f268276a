//! # UBX Frame Encoder
//!
//! Serializes UBX messages into wire frames.

use super::checksum::Checksum;
use super::protocol::*;
use crate::error::Result;

/// Encode a UBX frame into its wire representation
///
/// # Arguments
///
/// * `frame` - Frame to serialize
///
/// # Returns
///
/// * `Result<Vec<u8>>` - Complete UBX frame: sync(2) + class + id + length(2, LE) + payload + checksum(2)
///
/// # Errors
///
/// Returns `PayloadTooLarge` if the payload does not fit the length field.
///
/// # Examples
///
/// ```
/// use h2_sensor_node::ubx::encoder::encode_frame;
/// use h2_sensor_node::ubx::protocol::{UbxFrame, UBX_CLASS_NAV, UBX_NAV_PVT};
///
/// let frame = encode_frame(&UbxFrame::poll(UBX_CLASS_NAV, UBX_NAV_PVT))?;
/// assert_eq!(frame, vec![0xB5, 0x62, 0x01, 0x07, 0x00, 0x00, 0x08, 0x19]);
/// # Ok::<(), h2_sensor_node::error::SensorNodeError>(())
/// ```
pub fn encode_frame(frame: &UbxFrame) -> Result<Vec<u8>> {
    let [len_lo, len_hi] = frame.length()?.to_le_bytes();

    let mut bytes = Vec::with_capacity(frame.wire_len());
    bytes.push(UBX_SYNC_CHAR_1);
    bytes.push(UBX_SYNC_CHAR_2);
    bytes.push(frame.class());
    bytes.push(frame.id());
    bytes.push(len_lo);
    bytes.push(len_hi);
    bytes.extend_from_slice(frame.payload());

    // Checksum over class + id + length + payload (everything after sync)
    let mut checksum = Checksum::new();
    checksum.update(&bytes[2..]);
    bytes.extend_from_slice(&checksum.finish());

    Ok(bytes)
}

/// Validate and encode a message in one step
///
/// # Errors
///
/// Returns `PayloadTooLarge` before producing any byte if the payload
/// exceeds 65535 bytes.
pub fn encode(class: u8, id: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let frame = UbxFrame::new(class, id, payload.to_vec())?;
    encode_frame(&frame)
}
