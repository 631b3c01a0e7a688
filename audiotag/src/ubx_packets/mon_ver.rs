use crate::error::ParserError;

const SOFTWARE_VERSION_LEN: usize = 30;
const HARDWARE_VERSION_LEN: usize = 10;
const EXTENSION_LEN: usize = 30;
/// Extension strings kept from a MON-VER answer
pub const MAX_EXTENSIONS: usize = 7;

pub type VersionString = heapless::String<SOFTWARE_VERSION_LEN>;

/// Receiver/Software Version
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MonVer {
    pub software_version: VersionString,
    pub hardware_version: heapless::String<HARDWARE_VERSION_LEN>,
    /// Extended software information strings, e.g. `PROTVER=34.10`
    pub extensions: heapless::Vec<VersionString, MAX_EXTENSIONS>,
}

impl MonVer {
    pub const CLASS: u8 = 0x0a;
    pub const ID: u8 = 0x04;
    pub const MIN_PACKET_LEN: usize = SOFTWARE_VERSION_LEN + HARDWARE_VERSION_LEN;

    pub fn is_valid_len(len: usize) -> bool {
        len >= Self::MIN_PACKET_LEN && (len - Self::MIN_PACKET_LEN) % EXTENSION_LEN == 0
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ParserError> {
        if !Self::is_valid_len(payload.len()) {
            return Err(ParserError::InvalidPacketLen {
                packet: "MonVer",
                expect: Self::MIN_PACKET_LEN,
                got: payload.len(),
            });
        }
        let mut extensions = heapless::Vec::new();
        for chunk in payload[Self::MIN_PACKET_LEN..].chunks(EXTENSION_LEN) {
            if extensions.push(cstr_field(chunk)).is_err() {
                break;
            }
        }
        Ok(Self {
            software_version: cstr_field(&payload[..SOFTWARE_VERSION_LEN]),
            hardware_version: cstr_field(&payload[SOFTWARE_VERSION_LEN..Self::MIN_PACKET_LEN]),
            extensions,
        })
    }

    /// Value of a `KEY=value` extension string
    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.iter().find_map(|ext| {
            let (k, v) = ext.split_once('=')?;
            (k == key).then_some(v)
        })
    }
}

/// NUL-terminated field; anything that is not ASCII is dropped
fn cstr_field<const N: usize>(bytes: &[u8]) -> heapless::String<N> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let mut out = heapless::String::new();
    for c in bytes[..end].iter().filter(|b| b.is_ascii()) {
        if out.push(char::from(*c)).is_err() {
            break;
        }
    }
    out
}
