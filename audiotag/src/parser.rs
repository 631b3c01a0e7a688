//! Byte-at-a-time UBX frame decoder.
//!
//! The decoder is an explicit state machine over the frame layout
//! `[sync1, sync2, class, id, len_lo, len_hi, payload[len], ck_a, ck_b]`.
//! Any framing failure drops the partial frame and scanning for a sync
//! sequence resumes with the very next byte, so a corrupted frame can never
//! wedge the decoder.

mod checksum;

pub use checksum::{ubx_checksum, UbxChecksumCalc};

use crate::constants::{UBX_MAX_PAYLOAD_LEN, UBX_SYNC_CHAR_1, UBX_SYNC_CHAR_2};

/// One validated UBX frame, borrowed from the decoder's working buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    class: u8,
    msg_id: u8,
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    pub const fn new(class: u8, msg_id: u8, payload: &'a [u8]) -> Self {
        Self {
            class,
            msg_id,
            payload,
        }
    }

    pub const fn class(&self) -> u8 {
        self.class
    }

    pub const fn msg_id(&self) -> u8 {
        self.msg_id
    }

    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Payload length as announced in the header
    pub const fn len(&self) -> usize {
        self.payload.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Where the decoder is inside the frame layout; each state names the byte it expects next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Idle,
    GotSync1,
    Class,
    Id,
    LenLo,
    LenHi,
    Payload,
    CkA,
    CkB,
}

/// Running counters, only useful for diagnostics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames that passed the checksum
    pub frames: u32,
    /// Frames dropped on `ck_a` or `ck_b`
    pub checksum_failures: u32,
    /// Frames dropped because the announced payload does not fit
    pub oversize: u32,
}

pub struct FrameDecoder {
    state: DecoderState,
    class: u8,
    msg_id: u8,
    len: usize,
    received: usize,
    checksum: UbxChecksumCalc,
    stats: DecoderStats,
    buf: [u8; UBX_MAX_PAYLOAD_LEN],
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            state: DecoderState::Idle,
            class: 0,
            msg_id: 0,
            len: 0,
            received: 0,
            checksum: UbxChecksumCalc::new(),
            stats: DecoderStats {
                frames: 0,
                checksum_failures: 0,
                oversize: 0,
            },
            buf: [0; UBX_MAX_PAYLOAD_LEN],
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Drops any partially received frame
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
    }

    /// Consumes one byte; returns a frame when `byte` completes a valid one
    pub fn feed(&mut self, byte: u8) -> Option<Frame<'_>> {
        match self.state {
            DecoderState::Idle => {
                if byte == UBX_SYNC_CHAR_1 {
                    self.state = DecoderState::GotSync1;
                }
            },
            DecoderState::GotSync1 => {
                self.state = match byte {
                    UBX_SYNC_CHAR_2 => {
                        self.checksum = UbxChecksumCalc::new();
                        self.len = 0;
                        self.received = 0;
                        DecoderState::Class
                    },
                    UBX_SYNC_CHAR_1 => DecoderState::GotSync1,
                    _ => DecoderState::Idle,
                };
            },
            DecoderState::Class => {
                self.class = byte;
                self.checksum.update_byte(byte);
                self.state = DecoderState::Id;
            },
            DecoderState::Id => {
                self.msg_id = byte;
                self.checksum.update_byte(byte);
                self.state = DecoderState::LenLo;
            },
            DecoderState::LenLo => {
                self.len = usize::from(byte);
                self.checksum.update_byte(byte);
                self.state = DecoderState::LenHi;
            },
            DecoderState::LenHi => {
                self.len |= usize::from(byte) << 8;
                self.checksum.update_byte(byte);
                self.state = if self.len == 0 {
                    DecoderState::CkA
                } else if self.len > UBX_MAX_PAYLOAD_LEN {
                    self.stats.oversize = self.stats.oversize.wrapping_add(1);
                    DecoderState::Idle
                } else {
                    DecoderState::Payload
                };
            },
            DecoderState::Payload => {
                self.buf[self.received] = byte;
                self.received += 1;
                self.checksum.update_byte(byte);
                if self.received == self.len {
                    self.state = DecoderState::CkA;
                }
            },
            DecoderState::CkA => {
                if byte == self.checksum.ck_a() {
                    self.state = DecoderState::CkB;
                } else {
                    self.stats.checksum_failures = self.stats.checksum_failures.wrapping_add(1);
                    self.state = DecoderState::Idle;
                }
            },
            DecoderState::CkB => {
                self.state = DecoderState::Idle;
                if byte == self.checksum.ck_b() {
                    self.stats.frames = self.stats.frames.wrapping_add(1);
                    return Some(Frame::new(
                        self.class,
                        self.msg_id,
                        &self.buf[..self.received],
                    ));
                }
                self.stats.checksum_failures = self.stats.checksum_failures.wrapping_add(1);
            },
        }
        None
    }
}
