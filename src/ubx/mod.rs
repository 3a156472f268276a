//! # UBX Protocol Module
//!
//! Implementation of the u-blox UBX binary protocol used to talk to the GNSS receiver.
//!
//! This module handles:
//! - Frame encoding (sync, class, id, little-endian length, payload, checksum)
//! - The two-accumulator running checksum
//! - Frame decoding and stream resynchronisation
//! - The 48-byte position/time aiding payload

pub mod protocol;
pub mod checksum;
pub mod encoder;
pub mod decoder;
pub mod aiding;
