//! Decode tables for the messages the logger consumes and builders for the
//! commands it sends. Every field is read at an explicit little-endian
//! offset; the payload length is checked before any offset is touched.

mod ack;
mod cfg_val;
mod mon_ver;
mod nav_pvt;
mod tim_tm2;

pub use ack::Ack;
pub use cfg_val::{
    CfgKey, CfgLayerGet, CfgLayerSet, CfgVal, CfgValGetRequest, CfgValGetResponse, CfgValIter,
    CfgValSet, StorageSize, MAX_CFG_KEYS,
};
pub use mon_ver::{MonVer, VersionString, MAX_EXTENSIONS};
pub use nav_pvt::{GpsFix, NavPvt, NavPvtFlags, NavPvtFlags2, NavPvtValidFlags};
pub use tim_tm2::{TimTm2, TimTm2Flags, TimTm2Mode, TimTm2Run, TimTm2TimeBase};

use crate::{
    constants::{
        UBX_CHECKSUM_LEN, UBX_CLASS_OFFSET, UBX_HEADER_LEN, UBX_MAX_PAYLOAD_LEN, UBX_SYNC_CHAR_1,
        UBX_SYNC_CHAR_2,
    },
    error::ParserError,
    parser::{Frame, UbxChecksumCalc},
};

/// Outgoing payload under construction
pub type PayloadBuf = heapless::Vec<u8, UBX_MAX_PAYLOAD_LEN>;

/// MON-VER poll, an empty MON-VER frame
pub const MON_VER_POLL: (u8, u8) = (MonVer::CLASS, MonVer::ID);

pub(crate) fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

pub(crate) fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

pub(crate) fn read_i32(buf: &[u8], at: usize) -> i32 {
    read_u32(buf, at) as i32
}

/// Writes the complete frame for `payload` into `out`, returns its length
pub fn encode_frame(
    class: u8,
    msg_id: u8,
    payload: &[u8],
    out: &mut [u8],
) -> Result<usize, ParserError> {
    if payload.len() > UBX_MAX_PAYLOAD_LEN {
        return Err(ParserError::InvalidPacketLen {
            packet: "frame",
            expect: UBX_MAX_PAYLOAD_LEN,
            got: payload.len(),
        });
    }
    let total = UBX_HEADER_LEN + payload.len() + UBX_CHECKSUM_LEN;
    if out.len() < total {
        return Err(ParserError::InvalidPacketLen {
            packet: "frame buffer",
            expect: total,
            got: out.len(),
        });
    }
    let len = (payload.len() as u16).to_le_bytes();
    out[..UBX_HEADER_LEN].copy_from_slice(&[
        UBX_SYNC_CHAR_1,
        UBX_SYNC_CHAR_2,
        class,
        msg_id,
        len[0],
        len[1],
    ]);
    out[UBX_HEADER_LEN..UBX_HEADER_LEN + payload.len()].copy_from_slice(payload);

    let mut checksum = UbxChecksumCalc::new();
    checksum.update(&out[UBX_CLASS_OFFSET..UBX_HEADER_LEN + payload.len()]);
    let (ck_a, ck_b) = checksum.result();
    out[total - 2] = ck_a;
    out[total - 1] = ck_b;
    Ok(total)
}

/// What a validated frame turned out to be.
///
/// Classification looks at `(class, id, length)` only; a known message with
/// an unexpected length is `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    PositionFix(NavPvt),
    TimeMark(TimTm2),
    ConfigValue(CfgValGetResponse),
    ConfigAck(Ack),
    Version(MonVer),
    Unknown { class: u8, msg_id: u8, len: usize },
}

impl MessageKind {
    pub fn classify(frame: &Frame<'_>) -> Self {
        let payload = frame.payload();
        let decoded = match (frame.class(), frame.msg_id()) {
            (NavPvt::CLASS, NavPvt::ID) => NavPvt::parse(payload).map(Self::PositionFix),
            (TimTm2::CLASS, TimTm2::ID) => TimTm2::parse(payload).map(Self::TimeMark),
            (CfgValGetResponse::CLASS, CfgValGetResponse::ID) => {
                CfgValGetResponse::parse(payload).map(Self::ConfigValue)
            },
            (Ack::CLASS, id @ (Ack::ID_ACK | Ack::ID_NAK)) => {
                Ack::parse(id, payload).map(Self::ConfigAck)
            },
            (MonVer::CLASS, MonVer::ID) => MonVer::parse(payload).map(Self::Version),
            _ => Err(ParserError::InvalidField {
                packet: "frame",
                field: "class",
            }),
        };
        decoded.unwrap_or(Self::Unknown {
            class: frame.class(),
            msg_id: frame.msg_id(),
            len: frame.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::UBX_MAX_FRAME_LEN;

    #[test]
    fn test_encode_mon_ver_poll() {
        let mut out = [0u8; UBX_MAX_FRAME_LEN];
        let n = encode_frame(MON_VER_POLL.0, MON_VER_POLL.1, &[], &mut out).unwrap();
        assert_eq!(&out[..n], &[0xb5, 0x62, 0x0a, 0x04, 0x00, 0x00, 0x0e, 0x34]);
    }

    #[test]
    fn test_encode_lna_valget_frame() {
        let mut out = [0u8; UBX_MAX_FRAME_LEN];
        let payload = CfgValGetRequest::new(&[CfgKey::CFG_HW_RF_LNA_MODE])
            .payload()
            .unwrap();
        let n = encode_frame(0x06, 0x8b, &payload, &mut out).unwrap();
        assert_eq!(n, 16);
        assert_eq!(UbxChecksumCalc::validate_frame(&out[..n]), Ok(()));
    }

    #[test]
    fn test_encode_rejects_oversize() {
        let mut out = [0u8; 512];
        assert!(encode_frame(0x01, 0x02, &[0u8; 256], &mut out).is_err());
        let mut small = [0u8; 9];
        assert!(encode_frame(0x01, 0x02, &[0u8; 2], &mut small).is_err());
    }

    #[test]
    fn test_classify_by_length() {
        let ack = Frame::new(0x05, 0x01, &[0x06, 0x8a]);
        assert!(matches!(
            MessageKind::classify(&ack),
            MessageKind::ConfigAck(Ack { accepted: true, .. })
        ));
        let nak = Frame::new(0x05, 0x00, &[0x06, 0x8a]);
        assert!(matches!(
            MessageKind::classify(&nak),
            MessageKind::ConfigAck(Ack { accepted: false, .. })
        ));

        let short_pvt = [0u8; 84];
        assert_eq!(
            MessageKind::classify(&Frame::new(0x01, 0x07, &short_pvt)),
            MessageKind::Unknown {
                class: 0x01,
                msg_id: 0x07,
                len: 84
            }
        );
        let tm2 = [0u8; 28];
        assert!(matches!(
            MessageKind::classify(&Frame::new(0x0d, 0x03, &tm2)),
            MessageKind::TimeMark(_)
        ));
        let ver = [0u8; 70];
        assert!(matches!(
            MessageKind::classify(&Frame::new(0x0a, 0x04, &ver)),
            MessageKind::Version(_)
        ));
        assert!(matches!(
            MessageKind::classify(&Frame::new(0x0a, 0x04, &ver[..50])),
            MessageKind::Unknown { .. }
        ));
        assert!(matches!(
            MessageKind::classify(&Frame::new(0x06, 0x8b, &[0, 0, 0])),
            MessageKind::Unknown { .. }
        ));
        assert!(matches!(
            MessageKind::classify(&Frame::new(0x02, 0x15, &[])),
            MessageKind::Unknown { .. }
        ));
    }
}
