use crate::{
    constants::{UBX_CHECKSUM_LEN, UBX_CLASS_OFFSET},
    error::ParserError,
};

/// 8-bit Fletcher checksum over `class, id, length, payload`, fed one byte
/// at a time by the decoder or in one go when building a frame
#[derive(Debug, Default, Clone, Copy)]
pub struct UbxChecksumCalc {
    ck_a: u8,
    ck_b: u8,
}

impl UbxChecksumCalc {
    pub const fn new() -> Self {
        Self { ck_a: 0, ck_b: 0 }
    }

    pub const fn update(&mut self, bytes: &[u8]) {
        let mut i = 0;
        while i < bytes.len() {
            self.update_byte(bytes[i]);
            i += 1;
        }
    }

    pub const fn update_byte(&mut self, byte: u8) {
        self.ck_a = self.ck_a.wrapping_add(byte);
        self.ck_b = self.ck_b.wrapping_add(self.ck_a);
    }

    pub const fn result(self) -> (u8, u8) {
        (self.ck_a, self.ck_b)
    }

    pub(crate) const fn ck_a(&self) -> u8 {
        self.ck_a
    }

    pub(crate) const fn ck_b(&self) -> u8 {
        self.ck_b
    }

    /// `expect` in the error is the received pair, `got` the computed one
    pub const fn validate_result(
        self,
        received_ck_a: u8,
        received_ck_b: u8,
    ) -> Result<(), ParserError> {
        if self.is_valid(received_ck_a, received_ck_b) {
            Ok(())
        } else {
            let (calculated_ck_a, calculated_ck_b) = self.result();
            Err(ParserError::InvalidChecksum {
                expect: u16::from_le_bytes([received_ck_a, received_ck_b]),
                got: u16::from_le_bytes([calculated_ck_a, calculated_ck_b]),
            })
        }
    }

    /// Single-shot validation of a complete frame, sync characters included
    pub fn validate_frame(frame: &[u8]) -> Result<(), ParserError> {
        if frame.len() < UBX_CLASS_OFFSET + 4 + UBX_CHECKSUM_LEN {
            return Err(ParserError::InvalidPacketLen {
                packet: "frame",
                expect: UBX_CLASS_OFFSET + 4 + UBX_CHECKSUM_LEN,
                got: frame.len(),
            });
        }
        let ck_at = frame.len() - UBX_CHECKSUM_LEN;
        let mut calc = Self::new();
        calc.update(&frame[UBX_CLASS_OFFSET..ck_at]);
        calc.validate_result(frame[ck_at], frame[ck_at + 1])
    }

    const fn is_valid(&self, received_ck_a: u8, received_ck_b: u8) -> bool {
        self.ck_a == received_ck_a && self.ck_b == received_ck_b
    }
}

/// Checksum of `class, id, len_lo, len_hi, payload`
pub fn ubx_checksum(bytes: &[u8]) -> (u8, u8) {
    let mut calc = UbxChecksumCalc::new();
    calc.update(bytes);
    calc.result()
}
