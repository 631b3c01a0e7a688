use crate::error::ParserError;

/// ACK-ACK or ACK-NAK for a configuration command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Ack {
    /// Class ID of the Acknowledged Message
    pub class: u8,
    /// Message ID of the Acknowledged Message
    pub msg_id: u8,
    /// `false` for ACK-NAK
    pub accepted: bool,
}

impl Ack {
    pub const CLASS: u8 = 0x05;
    pub const ID_ACK: u8 = 0x01;
    pub const ID_NAK: u8 = 0x00;
    pub const PACKET_LEN: usize = 2;

    pub fn parse(msg_id: u8, payload: &[u8]) -> Result<Self, ParserError> {
        if payload.len() != Self::PACKET_LEN {
            return Err(ParserError::InvalidPacketLen {
                packet: "Ack",
                expect: Self::PACKET_LEN,
                got: payload.len(),
            });
        }
        let accepted = match msg_id {
            Self::ID_ACK => true,
            Self::ID_NAK => false,
            _ => {
                return Err(ParserError::InvalidField {
                    packet: "Ack",
                    field: "msg_id",
                })
            },
        };
        Ok(Self {
            class: payload[0],
            msg_id: payload[1],
            accepted,
        })
    }

    pub fn is_for(&self, class: u8, msg_id: u8) -> bool {
        self.class == class && self.msg_id == msg_id
    }
}
