//! # UBX Checksum
//!
//! Running two-accumulator (8-bit Fletcher) checksum used by UBX frames.
//!
//! For each byte `b`: `ck_a = ck_a + b`, then `ck_b = ck_b + ck_a`, both mod 256.
//! The checksum covers class, id, length (low byte first) and payload, in that order.

/// Incremental checksum accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum {
    ck_a: u8,
    ck_b: u8,
}

impl Checksum {
    /// Create an accumulator with both sums at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate a single byte
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.ck_a = self.ck_a.wrapping_add(byte);
        self.ck_b = self.ck_b.wrapping_add(self.ck_a);
    }

    /// Accumulate a byte slice in order
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.push(byte);
        }
    }

    /// Final checksum bytes as transmitted: `[ck_a, ck_b]`
    pub fn finish(&self) -> [u8; 2] {
        [self.ck_a, self.ck_b]
    }
}

/// Calculate the UBX checksum of a byte sequence
///
/// # Arguments
///
/// * `data` - Bytes covered by the checksum (class + id + length + payload)
///
/// # Returns
///
/// * `[u8; 2]` - `[ck_a, ck_b]`
///
/// # Examples
///
/// ```
/// use h2_sensor_node::ubx::checksum::ubx_checksum;
///
/// // NAV-PVT poll request: class 0x01, id 0x07, zero length
/// assert_eq!(ubx_checksum(&[0x01, 0x07, 0x00, 0x00]), [0x08, 0x19]);
/// ```
pub fn ubx_checksum(data: &[u8]) -> [u8; 2] {
    let mut checksum = Checksum::new();
    checksum.update(data);
    checksum.finish()
}
