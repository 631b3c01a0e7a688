pub const UBX_SYNC_CHAR_1: u8 = 0xb5;
pub const UBX_SYNC_CHAR_2: u8 = 0x62;
pub(crate) const UBX_SYNC_SIZE: usize = 2;
pub(crate) const UBX_PAYLOAD_SIZE_LEN: usize = 2;
pub(crate) const UBX_CLASS_LEN: usize = 1;
pub(crate) const UBX_ID_LEN: usize = 1;
pub(crate) const UBX_HEADER_LEN: usize =
    UBX_SYNC_SIZE + UBX_PAYLOAD_SIZE_LEN + UBX_CLASS_LEN + UBX_ID_LEN;
pub(crate) const UBX_CHECKSUM_LEN: usize = 2;

/// Largest payload the frame decoder will buffer
pub const UBX_MAX_PAYLOAD_LEN: usize = 255;
/// Largest complete frame: header, payload and checksum
pub const UBX_MAX_FRAME_LEN: usize = UBX_HEADER_LEN + UBX_MAX_PAYLOAD_LEN + UBX_CHECKSUM_LEN;

pub(crate) const UBX_CLASS_OFFSET: usize = 2; // After SYNC_CHAR_1, SYNC_CHAR_2

/// Seconds in one GPS week
pub const SECONDS_PER_WEEK: f64 = 604_800.0;

/// Start of the transport record, ahead of the timestamp
pub const RECORD_DELIMITER: [u8; 4] = [0x7e, 0x6f, 0x50, 0x11];
/// Delimiter, f64 timestamp and three f32 position fields
pub const RECORD_HEADER_LEN: usize = RECORD_DELIMITER.len() + 8 + 3 * 4;

/// Minimum time the reset line is held low
pub const RESET_HOLD_MS: u32 = 1_100;
/// Pause after enabling GNSS signals before the next query
pub const SIGNAL_SETTLE_MS: u32 = 500;
/// GPS-UTC offset in effect since 2017-01-01
pub const GPS_UTC_LEAP_SECONDS: i32 = 18;
