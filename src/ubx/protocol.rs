//! # UBX Protocol Constants and Types
//!
//! Core protocol definitions for UBX communication.

use crate::error::{Result, SensorNodeError};

/// First UBX sync byte
pub const UBX_SYNC_CHAR_1: u8 = 0xB5;

/// Second UBX sync byte
pub const UBX_SYNC_CHAR_2: u8 = 0x62;

/// Header size: sync(2) + class(1) + id(1) + length(2)
pub const UBX_HEADER_SIZE: usize = 6;

/// Checksum size: ck_a(1) + ck_b(1)
pub const UBX_CHECKSUM_SIZE: usize = 2;

/// Frame overhead around the payload
pub const UBX_FRAME_OVERHEAD: usize = UBX_HEADER_SIZE + UBX_CHECKSUM_SIZE;

/// Maximum payload size allowed by the 16-bit length field
pub const UBX_MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Largest payload accepted from the receiver
///
/// Replies handled here are at most NAV-PVT sized; a longer declared length
/// is treated as a corrupt header.
pub const UBX_MAX_RX_PAYLOAD_SIZE: usize = 512;

/// Navigation results class
pub const UBX_CLASS_NAV: u8 = 0x01;

/// Acknowledgement class
pub const UBX_CLASS_ACK: u8 = 0x05;

/// Configuration class
pub const UBX_CLASS_CFG: u8 = 0x06;

/// Assist (aiding) class
pub const UBX_CLASS_AID: u8 = 0x0B;

/// NAV-PVT: position, velocity, time solution
pub const UBX_NAV_PVT: u8 = 0x07;

/// ACK-NAK: message rejected
pub const UBX_ACK_NAK: u8 = 0x00;

/// ACK-ACK: message accepted
pub const UBX_ACK_ACK: u8 = 0x01;

/// CFG-PRT: port configuration
pub const UBX_CFG_PRT: u8 = 0x00;

/// CFG-CFG: save/clear/load configuration
pub const UBX_CFG_CFG: u8 = 0x09;

/// AID-INI: initial position/time aiding
pub const UBX_AID_INI: u8 = 0x01;

/// NAV-PVT payload size
pub const UBX_NAV_PVT_PAYLOAD_SIZE: usize = 92;

/// Offset of gSpeed (ground speed, mm/s, i32) inside NAV-PVT
pub const UBX_NAV_PVT_GSPEED_OFFSET: usize = 60;

/// CFG-PRT payload size for a single port
pub const UBX_CFG_PRT_PAYLOAD_SIZE: usize = 20;

/// Offset of outProtoMask (u16) inside CFG-PRT
pub const UBX_CFG_PRT_OUT_PROTO_OFFSET: usize = 14;

/// outProtoMask bit for UBX output
pub const UBX_PROTO_MASK_UBX: u16 = 0x0001;

/// CFG-CFG payload size (clear, save and load masks)
pub const UBX_CFG_CFG_PAYLOAD_SIZE: usize = 12;

/// CFG-CFG save mask covering every configuration section
pub const UBX_CFG_SAVE_ALL: u32 = 0x0000_FFFF;

/// UBX frame structure
///
/// Fields are private so every frame goes through the length check in
/// [`UbxFrame::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UbxFrame {
    class: u8,
    id: u8,
    payload: Vec<u8>,
}

impl UbxFrame {
    /// Create a new UBX frame
    ///
    /// # Arguments
    ///
    /// * `class` - Message class byte
    /// * `id` - Message id byte
    /// * `payload` - Payload data (max 65535 bytes)
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if the payload does not fit the 16-bit length
    /// field. Nothing is truncated.
    pub fn new(class: u8, id: u8, payload: Vec<u8>) -> Result<Self> {
        if payload.len() > UBX_MAX_PAYLOAD_SIZE {
            return Err(SensorNodeError::PayloadTooLarge { len: payload.len() });
        }

        Ok(Self { class, id, payload })
    }

    /// Create a poll request (empty payload)
    pub fn poll(class: u8, id: u8) -> Self {
        Self {
            class,
            id,
            payload: Vec::new(),
        }
    }

    /// Message class
    pub fn class(&self) -> u8 {
        self.class
    }

    /// Message id
    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Payload length as carried in the length field
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` rather than truncating to 16 bits
    pub fn length(&self) -> Result<u16> {
        u16::try_from(self.payload.len())
            .map_err(|_| SensorNodeError::PayloadTooLarge { len: self.payload.len() })
    }

    /// Total size on the wire
    pub fn wire_len(&self) -> usize {
        UBX_FRAME_OVERHEAD + self.payload.len()
    }

    /// True if this frame carries the given class/id pair
    pub fn is(&self, class: u8, id: u8) -> bool {
        self.class == class && self.id == id
    }
}
