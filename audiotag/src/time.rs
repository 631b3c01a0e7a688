use chrono::{DateTime, Utc};

use crate::constants::SECONDS_PER_WEEK;

/// Seconds between the Unix epoch and the GPS epoch (1980-01-06T00:00:00Z)
const GPS_EPOCH_UNIX_SECS: i64 = 315_964_800;

/// GPS-disciplined absolute time, seconds since the GPS epoch.
///
/// `0.0` doubles as the "unset" marker: no real edge can be time-tagged at
/// the epoch itself.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsTimestamp(f64);

impl GpsTimestamp {
    pub const UNSET: Self = Self(0.0);

    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// `week * 604800 + tow_ms * 1e-3 + tow_sub_ms * 1e-9`
    pub fn from_week_tow(week: u16, tow_ms: u32, tow_sub_ms: u32) -> Self {
        Self(
            f64::from(week) * SECONDS_PER_WEEK
                + f64::from(tow_ms) * 1e-3
                + f64::from(tow_sub_ms) * 1e-9,
        )
    }

    pub const fn as_secs(self) -> f64 {
        self.0
    }

    pub fn is_unset(self) -> bool {
        self.0 == 0.0
    }

    pub(crate) fn to_bits(self) -> u64 {
        self.0.to_bits()
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Self(f64::from_bits(bits))
    }

    /// GPS week number
    pub fn week(self) -> u32 {
        (self.0 / SECONDS_PER_WEEK) as u32
    }

    /// Seconds into the GPS week
    pub fn time_of_week(self) -> f64 {
        self.0 % SECONDS_PER_WEEK
    }

    /// Converts to UTC given the current GPS-UTC leap second offset.
    /// Returns `None` for the unset marker.
    pub fn to_utc(self, leap_seconds: i32) -> Option<DateTime<Utc>> {
        if self.is_unset() {
            return None;
        }
        let whole = self.0.floor();
        let nanos = ((self.0 - whole) * 1e9) as u32;
        let secs = GPS_EPOCH_UNIX_SECS + whole as i64 - i64::from(leap_seconds);
        DateTime::from_timestamp(secs, nanos.min(999_999_999))
    }
}

impl From<GpsTimestamp> for f64 {
    fn from(ts: GpsTimestamp) -> Self {
        ts.0
    }
}
