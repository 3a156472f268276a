//! # Position/Time Aiding
//!
//! Builds the 48-byte AID-INI payload that seeds the receiver with an assumed
//! position and UTC time to speed up satellite acquisition.
//!
//! ## Payload layout (all integers little-endian)
//!
//! ```text
//! Offset  Size  Field
//!  0      1     mask: position (0x01)
//!  1      1     mask: time     (0x02)
//!  4      12    ECEF X/Y/Z (always zero)
//! 16      4     latitude   i32, 1e-7 deg
//! 20      4     longitude  i32, 1e-7 deg
//! 24      4     altitude   i32, mm
//! 28      2     year       u16
//! 30..=34 1     month, day, hour, minute, second
//! 35      13    zero padding
//! ```

use super::protocol::{UbxFrame, UBX_AID_INI, UBX_CLASS_AID};
use crate::error::{Result, SensorNodeError};

/// AID-INI payload size
pub const AID_INI_PAYLOAD_SIZE: usize = 48;

/// Position-valid mask flag (offset 0)
pub const AID_MASK_POSITION: u8 = 0x01;

/// Time-valid mask flag (offset 1)
pub const AID_MASK_TIME: u8 = 0x02;

const OFFSET_MASK_POSITION: usize = 0;
const OFFSET_MASK_TIME: usize = 1;
const OFFSET_ECEF_X: usize = 4;
const OFFSET_ECEF_Y: usize = 8;
const OFFSET_ECEF_Z: usize = 12;
const OFFSET_LATITUDE: usize = 16;
const OFFSET_LONGITUDE: usize = 20;
const OFFSET_ALTITUDE: usize = 24;
const OFFSET_YEAR: usize = 28;
const OFFSET_MONTH: usize = 30;
const OFFSET_DAY: usize = 31;
const OFFSET_HOUR: usize = 32;
const OFFSET_MINUTE: usize = 33;
const OFFSET_SECOND: usize = 34;

/// Degrees to 1e-7 degree units
const DEGREE_SCALE: f64 = 10_000_000.0;

/// Meters to millimeters
const ALTITUDE_SCALE: f64 = 1000.0;

/// Altitude accepted for aiding, in meters (either side of the ellipsoid)
pub const MAX_AIDING_ALTITUDE_M: f64 = 100_000.0;

/// UTC calendar time used for aiding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AidingTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Assumed receiver position and time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AidingFix {
    /// Latitude in decimal degrees
    pub latitude_deg: f64,

    /// Longitude in decimal degrees
    pub longitude_deg: f64,

    /// Altitude in meters
    pub altitude_m: f64,

    /// UTC time
    pub time: AidingTime,
}

/// A packed AID-INI payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AidingPayload([u8; AID_INI_PAYLOAD_SIZE]);

impl AidingPayload {
    /// Raw payload bytes
    pub fn as_bytes(&self) -> &[u8; AID_INI_PAYLOAD_SIZE] {
        &self.0
    }

    fn put_u8(&mut self, offset: usize, value: u8) {
        self.0[offset] = value;
    }

    fn put_u16(&mut self, offset: usize, value: u16) {
        self.0[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn put_i32(&mut self, offset: usize, value: i32) {
        self.0[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

impl AidingTime {
    fn validate(&self) -> Result<()> {
        let checks = [
            ("month", (1..=12).contains(&self.month)),
            ("day", (1..=31).contains(&self.day)),
            ("hour", self.hour < 24),
            ("minute", self.minute < 60),
            ("second", self.second < 60),
        ];

        for (name, ok) in checks {
            if !ok {
                return Err(SensorNodeError::Ubx(format!("aiding {} is out of range", name)));
            }
        }

        Ok(())
    }
}

impl AidingFix {
    /// Check that every field can be represented in the payload
    ///
    /// # Errors
    ///
    /// Returns error for non-finite or out-of-range coordinates, altitude
    /// beyond ±100 km, or impossible calendar fields.
    pub fn validate(&self) -> Result<()> {
        if !self.latitude_deg.is_finite() || self.latitude_deg.abs() > 90.0 {
            return Err(SensorNodeError::Ubx(format!(
                "aiding latitude {} must be within ±90 degrees",
                self.latitude_deg
            )));
        }

        if !self.longitude_deg.is_finite() || self.longitude_deg.abs() > 180.0 {
            return Err(SensorNodeError::Ubx(format!(
                "aiding longitude {} must be within ±180 degrees",
                self.longitude_deg
            )));
        }

        if !self.altitude_m.is_finite() || self.altitude_m.abs() > MAX_AIDING_ALTITUDE_M {
            return Err(SensorNodeError::Ubx(format!(
                "aiding altitude {} m must be within ±{} m",
                self.altitude_m, MAX_AIDING_ALTITUDE_M
            )));
        }

        self.time.validate()
    }

    /// Latitude in 1e-7 degree units
    pub fn latitude_e7(&self) -> i32 {
        (self.latitude_deg * DEGREE_SCALE).round() as i32
    }

    /// Longitude in 1e-7 degree units
    pub fn longitude_e7(&self) -> i32 {
        (self.longitude_deg * DEGREE_SCALE).round() as i32
    }

    /// Altitude in millimeters
    pub fn altitude_mm(&self) -> i32 {
        (self.altitude_m * ALTITUDE_SCALE).round() as i32
    }

    /// Pack the fix into an AID-INI payload
    ///
    /// # Examples
    ///
    /// ```
    /// use h2_sensor_node::ubx::aiding::{AidingFix, AidingTime};
    ///
    /// let fix = AidingFix {
    ///     latitude_deg: 41.0082,
    ///     longitude_deg: 28.9784,
    ///     altitude_m: 50.0,
    ///     time: AidingTime { year: 2025, month: 6, day: 30, hour: 12, minute: 0, second: 0 },
    /// };
    /// let payload = fix.to_payload()?;
    /// assert_eq!(&payload.as_bytes()[16..20], &410_082_000i32.to_le_bytes());
    /// # Ok::<(), h2_sensor_node::error::SensorNodeError>(())
    /// ```
    pub fn to_payload(&self) -> Result<AidingPayload> {
        self.validate()?;

        let mut payload = AidingPayload([0u8; AID_INI_PAYLOAD_SIZE]);
        payload.put_u8(OFFSET_MASK_POSITION, AID_MASK_POSITION);
        payload.put_u8(OFFSET_MASK_TIME, AID_MASK_TIME);

        // Lat/lon/alt are always used, never the ECEF variant
        payload.put_i32(OFFSET_ECEF_X, 0);
        payload.put_i32(OFFSET_ECEF_Y, 0);
        payload.put_i32(OFFSET_ECEF_Z, 0);

        payload.put_i32(OFFSET_LATITUDE, self.latitude_e7());
        payload.put_i32(OFFSET_LONGITUDE, self.longitude_e7());
        payload.put_i32(OFFSET_ALTITUDE, self.altitude_mm());

        payload.put_u16(OFFSET_YEAR, self.time.year);
        payload.put_u8(OFFSET_MONTH, self.time.month);
        payload.put_u8(OFFSET_DAY, self.time.day);
        payload.put_u8(OFFSET_HOUR, self.time.hour);
        payload.put_u8(OFFSET_MINUTE, self.time.minute);
        payload.put_u8(OFFSET_SECOND, self.time.second);

        Ok(payload)
    }

    /// Build the complete AID-INI frame
    pub fn to_frame(&self) -> Result<UbxFrame> {
        let payload = self.to_payload()?;
        UbxFrame::new(UBX_CLASS_AID, UBX_AID_INI, payload.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ubx::encoder::encode_frame;

    fn istanbul() -> AidingFix {
        AidingFix {
            latitude_deg: 41.0082,
            longitude_deg: 28.9784,
            altitude_m: 50.0,
            time: AidingTime {
                year: 2025,
                month: 6,
                day: 30,
                hour: 12,
                minute: 0,
                second: 0,
            },
        }
    }

    fn read_i32(bytes: &[u8], offset: usize) -> i32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[offset..offset + 4]);
        i32::from_le_bytes(raw)
    }

    #[test]
    fn test_scaled_position_fields() {
        let payload = istanbul().to_payload().unwrap();
        let bytes = payload.as_bytes();

        assert_eq!(read_i32(bytes, 16), 410_082_000);
        assert_eq!(read_i32(bytes, 20), 289_784_000);
        assert_eq!(read_i32(bytes, 24), 50_000);
        assert_eq!(&bytes[16..20], &410_082_000i32.to_le_bytes());
    }

    #[test]
    fn test_mask_and_time_fields() {
        let payload = istanbul().to_payload().unwrap();
        let bytes = payload.as_bytes();

        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[1], 0x02);
        assert_eq!(&bytes[28..30], &2025u16.to_le_bytes());
        assert_eq!(&bytes[30..35], &[6, 30, 12, 0, 0]);
    }

    #[test]
    fn test_ecef_and_padding_are_zero() {
        let payload = istanbul().to_payload().unwrap();
        let bytes = payload.as_bytes();

        assert_eq!(bytes.len(), AID_INI_PAYLOAD_SIZE);
        assert!(bytes[2..16].iter().all(|&b| b == 0));
        assert!(bytes[35..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_negative_coordinates_round_to_nearest() {
        let mut fix = istanbul();
        fix.latitude_deg = -33.868_820_04;
        fix.longitude_deg = -151.209_295_06;
        fix.altitude_m = -0.4996;

        assert_eq!(fix.latitude_e7(), -338_688_200);
        assert_eq!(fix.longitude_e7(), -1_512_092_951);
        assert_eq!(fix.altitude_mm(), -500);
    }

    #[test]
    fn test_extreme_coordinates_fit_i32() {
        let mut fix = istanbul();
        fix.latitude_deg = 90.0;
        fix.longitude_deg = -180.0;
        fix.altitude_m = MAX_AIDING_ALTITUDE_M;

        let bytes = *fix.to_payload().unwrap().as_bytes();
        assert_eq!(read_i32(&bytes, 16), 900_000_000);
        assert_eq!(read_i32(&bytes, 20), -1_800_000_000);
        assert_eq!(read_i32(&bytes, 24), 100_000_000);
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        let mut fix = istanbul();
        fix.latitude_deg = 90.5;
        assert!(fix.to_payload().is_err());

        let mut fix = istanbul();
        fix.longitude_deg = f64::NAN;
        assert!(fix.to_payload().is_err());

        let mut fix = istanbul();
        fix.altitude_m = 200_000.0;
        assert!(fix.to_payload().is_err());

        let mut fix = istanbul();
        fix.time.month = 13;
        assert!(fix.to_payload().is_err());

        let mut fix = istanbul();
        fix.time.second = 60;
        assert!(fix.to_payload().is_err());
    }

    #[test]
    fn test_frame_identifies_aid_ini() {
        let frame = istanbul().to_frame().unwrap();
        assert_eq!(frame.class(), 0x0B);
        assert_eq!(frame.id(), 0x01);
        assert_eq!(frame.length().unwrap(), 48);

        let bytes = encode_frame(&frame).unwrap();
        assert_eq!(bytes.len(), 56);
        assert_eq!(&bytes[..6], &[0xB5, 0x62, 0x0B, 0x01, 0x30, 0x00]);
    }
}
