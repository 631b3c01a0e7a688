use bitflags::bitflags;

use super::{read_u16, read_u32};
use crate::{error::ParserError, time::GpsTimestamp};

/// Time mark data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TimTm2 {
    /// Channel (e.g. EXTINT) upon which the pulse was measured
    pub ch: u8,
    pub flags: TimTm2Flags,
    /// Rising edge counter
    pub count: u16,
    /// Week number of last rising edge
    pub wn_r: u16,
    /// Week number of last falling edge
    pub wn_f: u16,
    /// Tow of rising edge
    pub tow_ms_r: u32,
    /// Millisecond fraction of tow of rising edge in nanoseconds
    pub tow_sub_ms_r: u32,
    /// Tow of falling edge
    pub tow_ms_f: u32,
    /// Millisecond fraction of tow of falling edge in nanoseconds
    pub tow_sub_ms_f: u32,
    /// Accuracy estimate
    pub acc_est: u32,
}

impl TimTm2 {
    pub const CLASS: u8 = 0x0d;
    pub const ID: u8 = 0x03;
    pub const PACKET_LEN: usize = 28;

    pub fn parse(payload: &[u8]) -> Result<Self, ParserError> {
        if payload.len() != Self::PACKET_LEN {
            return Err(ParserError::InvalidPacketLen {
                packet: "TimTm2",
                expect: Self::PACKET_LEN,
                got: payload.len(),
            });
        }
        Ok(Self {
            ch: payload[0],
            flags: TimTm2Flags::from_bits_retain(payload[1]),
            count: read_u16(payload, 2),
            wn_r: read_u16(payload, 4),
            wn_f: read_u16(payload, 6),
            tow_ms_r: read_u32(payload, 8),
            tow_sub_ms_r: read_u32(payload, 12),
            tow_ms_f: read_u32(payload, 16),
            tow_sub_ms_f: read_u32(payload, 20),
            acc_est: read_u32(payload, 24),
        })
    }

    pub fn rising_edge(&self) -> GpsTimestamp {
        GpsTimestamp::from_week_tow(self.wn_r, self.tow_ms_r, self.tow_sub_ms_r)
    }

    pub fn falling_edge(&self) -> GpsTimestamp {
        GpsTimestamp::from_week_tow(self.wn_f, self.tow_ms_f, self.tow_sub_ms_f)
    }

    /// Time of the newest edge, rising first; `None` unless the receiver
    /// marks the time as valid.
    pub fn edge_timestamp(&self) -> Option<GpsTimestamp> {
        if !self.flags.time_valid() {
            return None;
        }
        if self.flags.new_rising_edge() {
            Some(self.rising_edge())
        } else if self.flags.new_falling_edge() {
            Some(self.falling_edge())
        } else {
            None
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize))]
    pub struct TimTm2Flags: u8 {
        /// 1 = running mode, 0 = single
        const MODE = 0b0000_0001;
        /// 1 = stopped, 0 = armed
        const RUN = 0b0000_0010;
        const NEW_FALLING_EDGE = 0b0000_0100;
        const TIME_BASE = 0b0001_1000;
        /// UTC available
        const UTC = 0b0010_0000;
        /// Time is valid
        const TIME = 0b0100_0000;
        const NEW_RISING_EDGE = 0b1000_0000;
    }
}

impl TimTm2Flags {
    pub fn mode(&self) -> TimTm2Mode {
        if self.contains(Self::MODE) {
            TimTm2Mode::Running
        } else {
            TimTm2Mode::Single
        }
    }

    pub fn run(&self) -> TimTm2Run {
        if self.contains(Self::RUN) {
            TimTm2Run::Stopped
        } else {
            TimTm2Run::Armed
        }
    }

    pub fn new_falling_edge(&self) -> bool {
        self.contains(Self::NEW_FALLING_EDGE)
    }

    pub fn new_rising_edge(&self) -> bool {
        self.contains(Self::NEW_RISING_EDGE)
    }

    pub fn time_base(&self) -> TimTm2TimeBase {
        match (self.bits() & Self::TIME_BASE.bits()) >> 3 {
            0 => TimTm2TimeBase::Receiver,
            1 => TimTm2TimeBase::Gnss,
            2 => TimTm2TimeBase::Utc,
            _ => TimTm2TimeBase::Reserved,
        }
    }

    /// UTC availability
    pub fn utc_available(&self) -> bool {
        self.contains(Self::UTC)
    }

    pub fn time_valid(&self) -> bool {
        self.contains(Self::TIME)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimTm2Mode {
    Single,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimTm2Run {
    Armed,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimTm2TimeBase {
    Receiver,
    Gnss,
    Utc,
    Reserved,
}
