//! # audiotag
//!
//! Receiver protocol engine and audio/time correlation core of a field audio
//! logger. One-second audio blocks are tagged with a GPS-disciplined
//! timestamp and the receiver position, then streamed over a byte link.
//!
//! The crate is organised around three execution contexts that share a
//! [`SharedState`] and a [`Handoff`] by reference:
//!
//! * the GPS link context owns a [`Device`]: link, [`FrameDecoder`],
//!   [`MessageInterpreter`] and reset line. At startup a [`ConfigSequencer`]
//!   brings the receiver to a [`ReceiverProfile`], afterwards [`Device::run`]
//!   keeps position and pending timestamp current;
//! * the capture context runs an [`AudioCapture`], which fills a
//!   [`DoubleBuffer`] slot, asks the [`TimestampCorrelator`] for the edge
//!   timestamp and publishes the tagged block;
//! * the consumer context runs a [`BlockForwarder`] writing [`AudioRecord`]s.
//!
//! Decoding frames
//! ===============
//!
//! ```
//! use audiotag::{FrameDecoder, MessageKind};
//!
//! let mut decoder = FrameDecoder::new();
//! let ack = [0xb5, 0x62, 0x05, 0x01, 0x02, 0x00, 0x06, 0x8a, 0x98, 0xc1];
//! let mut kinds = Vec::new();
//! for byte in ack {
//!     if let Some(frame) = decoder.feed(byte) {
//!         kinds.push(MessageKind::classify(&frame));
//!     }
//! }
//! assert!(matches!(kinds[..], [MessageKind::ConfigAck(_)]));
//! ```
//!
//! Building commands
//! =================
//!
//! ```
//! use audiotag::{encode_frame, CfgKey, CfgVal, CfgValSet, UBX_MAX_FRAME_LEN};
//!
//! let values = [CfgVal::new(CfgKey::CFG_RATE_MEAS, 500)];
//! let payload = CfgValSet::new(&values).payload().unwrap();
//! let mut frame = [0u8; UBX_MAX_FRAME_LEN];
//! let len = encode_frame(CfgValSet::CLASS, CfgValSet::ID, &payload, &mut frame).unwrap();
//! assert_eq!(&frame[..4], &[0xb5, 0x62, 0x06, 0x8a]);
//! assert_eq!(len, 6 + 4 + 6 + 2);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;
extern crate core;
#[cfg(feature = "serde")]
extern crate serde;

pub use crate::{
    audio::{AudioCapture, AudioSource, DoubleBuffer},
    constants::{
        GPS_UTC_LEAP_SECONDS, RECORD_DELIMITER, RECORD_HEADER_LEN, RESET_HOLD_MS,
        SECONDS_PER_WEEK, SIGNAL_SETTLE_MS, UBX_MAX_FRAME_LEN, UBX_MAX_PAYLOAD_LEN,
        UBX_SYNC_CHAR_1, UBX_SYNC_CHAR_2,
    },
    correlator::TimestampCorrelator,
    device::{Device, ReceiverLink},
    error::{CaptureError, Error, ParserError, PinError},
    handoff::{AudioBlock, BlockForwarder, Handoff, TaggedBlock},
    interpreter::MessageInterpreter,
    parser::{ubx_checksum, DecoderState, DecoderStats, Frame, FrameDecoder, UbxChecksumCalc},
    profile::{ConfigGroup, GroupValues, KeyName, ReceiverProfile, MAX_GROUP_ITEMS},
    record::{AudioRecord, RecordReader, RecordView},
    sequencer::{ConfigSequencer, SequencerReport, SequencerState},
    shared::{Position, SharedState},
    time::GpsTimestamp,
    ubx_packets::*,
};

mod audio;
mod constants;
mod correlator;
mod device;
mod error;
mod handoff;
mod interpreter;
mod parser;
mod profile;
mod record;
mod sequencer;
mod shared;
mod time;
mod ubx_packets;
