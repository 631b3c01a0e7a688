use bitflags::bitflags;

use super::{read_i32, read_u16, read_u32};
use crate::{error::ParserError, shared::Position};

/// Navigation position velocity time solution
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NavPvt {
    /// GPS Millisecond Time of Week
    pub itow: u32,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
    pub valid: NavPvtValidFlags,
    /// Time accuracy estimate in nanoseconds
    pub time_accuracy: u32,
    /// Fraction of second, range -1e9 .. 1e9 (UTC)
    pub nanosec: i32,
    pub fix_type: GpsFix,
    pub flags: NavPvtFlags,
    pub flags2: NavPvtFlags2,
    /// Number of satellites used in the solution
    pub num_satellites: u8,
    /// Longitude in 1e-7 degrees
    pub lon: i32,
    /// Latitude in 1e-7 degrees
    pub lat: i32,
    /// Height above ellipsoid in millimeters
    pub height_meters: i32,
    /// Height above mean sea level in millimeters
    pub height_msl: i32,
    /// Horizontal accuracy estimate in millimeters
    pub horiz_accuracy: u32,
    /// Vertical accuracy estimate in millimeters
    pub vert_accuracy: u32,
}

impl NavPvt {
    pub const CLASS: u8 = 0x01;
    pub const ID: u8 = 0x07;
    pub const PACKET_LEN: usize = 92;

    pub fn parse(payload: &[u8]) -> Result<Self, ParserError> {
        if payload.len() != Self::PACKET_LEN {
            return Err(ParserError::InvalidPacketLen {
                packet: "NavPvt",
                expect: Self::PACKET_LEN,
                got: payload.len(),
            });
        }
        Ok(Self {
            itow: read_u32(payload, 0),
            year: read_u16(payload, 4),
            month: payload[6],
            day: payload[7],
            hour: payload[8],
            min: payload[9],
            sec: payload[10],
            valid: NavPvtValidFlags::from_bits_retain(payload[11]),
            time_accuracy: read_u32(payload, 12),
            nanosec: read_i32(payload, 16),
            fix_type: GpsFix::from(payload[20]),
            flags: NavPvtFlags::from_bits_retain(payload[21]),
            flags2: NavPvtFlags2::from_bits_retain(payload[22]),
            num_satellites: payload[23],
            lon: read_i32(payload, 24),
            lat: read_i32(payload, 28),
            height_meters: read_i32(payload, 32),
            height_msl: read_i32(payload, 36),
            horiz_accuracy: read_u32(payload, 40),
            vert_accuracy: read_u32(payload, 44),
        })
    }

    pub fn gnss_fix_ok(&self) -> bool {
        self.flags.contains(NavPvtFlags::GPS_FIX_OK)
    }

    /// Latitude in degrees
    pub fn latitude(&self) -> f64 {
        f64::from(self.lat) * 1e-7
    }

    /// Longitude in degrees
    pub fn longitude(&self) -> f64 {
        f64::from(self.lon) * 1e-7
    }

    /// Height above ellipsoid in meters
    pub fn height(&self) -> f64 {
        f64::from(self.height_meters) * 1e-3
    }

    pub fn position(&self) -> Position {
        Position {
            lat: self.latitude() as f32,
            lon: self.longitude() as f32,
            height: self.height() as f32,
        }
    }
}

/// GPS fix Type
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum GpsFix {
    NoFix = 0,
    DeadReckoningOnly = 1,
    Fix2D = 2,
    Fix3D = 3,
    GPSPlusDeadReckoning = 4,
    TimeOnlyFix = 5,
}

impl From<u8> for GpsFix {
    /// Reserved values carry no usable solution
    fn from(raw: u8) -> Self {
        match raw {
            1 => Self::DeadReckoningOnly,
            2 => Self::Fix2D,
            3 => Self::Fix3D,
            4 => Self::GPSPlusDeadReckoning,
            5 => Self::TimeOnlyFix,
            _ => Self::NoFix,
        }
    }
}

bitflags! {
    /// Fix status flags for `NavPvt`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize))]
    pub struct NavPvtFlags: u8 {
        /// 1 = Position and velocity valid and within DOP and accuracy masks
        const GPS_FIX_OK = 1;
        /// 1 = Differential corrections were applied; DGPS used
        const DIFF_SOLN = 2;
        /// 1 = Heading of vehicle is valid, only set if the receiver is in sensor fusion mode
        const HEAD_VEH_VALID = 0x20;
        /// 1 = Carrier phase range solution with floating ambiguities
        const CARR_SOLN_FLOAT = 0x40;
        /// 1 = Carrier phase range solution with fixed ambiguities
        const CARR_SOLN_FIXED = 0x80;
    }
}

bitflags! {
    /// Additional flags for `NavPvt`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize))]
    pub struct NavPvtFlags2: u8 {
        /// 1 = information about UTC Date and Time of Day validity confirmation is available
        const CONFIRMED_AVAI = 0x20;
        /// 1 = UTC Date validity could be confirmed
        const CONFIRMED_DATE = 0x40;
        /// 1 = UTC Time of Day could be confirmed
        const CONFIRMED_TIME = 0x80;
    }
}

bitflags! {
    /// Validity flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize))]
    pub struct NavPvtValidFlags: u8 {
        /// 1 = valid UTC Date
        const VALID_DATE = 0x01;
        /// 1 = valid UTC time of day
        const VALID_TIME = 0x02;
        /// 1 = UTC time of day has been fully resolved (no seconds uncertainty).
        const FULLY_RESOLVED = 0x04;
        /// 1 = valid magnetic declination
        const VALID_MAG = 0x08;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> [u8; NavPvt::PACKET_LEN] {
        let mut p = [0u8; NavPvt::PACKET_LEN];
        p[0..4].copy_from_slice(&345_600_000_u32.to_le_bytes());
        p[4..6].copy_from_slice(&2024_u16.to_le_bytes());
        p[6] = 6;
        p[7] = 30;
        p[11] = 0x07;
        p[20] = 3;
        p[21] = 0x01;
        p[23] = 14;
        p[24..28].copy_from_slice(&(-1_223_456_789_i32).to_le_bytes());
        p[28..32].copy_from_slice(&473_456_789_i32.to_le_bytes());
        p[32..36].copy_from_slice(&412_345_i32.to_le_bytes());
        p[40..44].copy_from_slice(&1_500_u32.to_le_bytes());
        p
    }

    #[test]
    fn test_parse_offsets() {
        let pvt = NavPvt::parse(&payload()).unwrap();
        assert_eq!(pvt.itow, 345_600_000);
        assert_eq!((pvt.year, pvt.month, pvt.day), (2024, 6, 30));
        assert!(pvt.valid.contains(NavPvtValidFlags::FULLY_RESOLVED));
        assert_eq!(pvt.fix_type, GpsFix::Fix3D);
        assert!(pvt.gnss_fix_ok());
        assert_eq!(pvt.num_satellites, 14);
        assert_eq!(pvt.horiz_accuracy, 1_500);
        assert!((pvt.latitude() - 47.345_678_9).abs() < 1e-9);
        assert!((pvt.longitude() + 122.345_678_9).abs() < 1e-9);
        assert!((pvt.height() - 412.345).abs() < 1e-9);
    }

    #[test]
    fn test_position_scaling() {
        let p = NavPvt::parse(&payload()).unwrap().position();
        assert!((p.lat - 47.345_68).abs() < 1e-4);
        assert!((p.lon + 122.345_68).abs() < 1e-4);
        assert!((p.height - 412.345).abs() < 1e-3);
    }

    #[test]
    fn test_wrong_length() {
        assert!(matches!(
            NavPvt::parse(&[0u8; 84]),
            Err(ParserError::InvalidPacketLen { expect: 92, got: 84, .. })
        ));
    }

    #[test]
    fn test_reserved_fix_type() {
        assert_eq!(GpsFix::from(9), GpsFix::NoFix);
    }
}
