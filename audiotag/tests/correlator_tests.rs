//! Edge-trigger requests against time marks coming back over the link.

#![cfg(feature = "std")]

mod common;

use audiotag::{FrameDecoder, GpsTimestamp, MessageInterpreter, SharedState, TimestampCorrelator};
use common::{RecordingPin, TimTm2Payload};
use proptest::prelude::*;

/// Time mark the receiver reports for edge number `edge` (1-based)
fn time_mark(edge: u16, week: u16, tow_ms: u32, tow_sub_ms: u32) -> Vec<u8> {
    // the line starts low, odd edges rise
    if edge % 2 == 1 {
        TimTm2Payload::rising(edge, week, tow_ms, tow_sub_ms).to_frame()
    } else {
        TimTm2Payload::falling(edge, week, tow_ms, tow_sub_ms).to_frame()
    }
}

fn deliver(decoder: &mut FrameDecoder, interpreter: &mut MessageInterpreter<'_>, bytes: &[u8]) {
    for byte in bytes {
        if let Some(frame) = decoder.feed(*byte) {
            interpreter.interpret(&frame);
        }
    }
}

#[test]
fn test_each_request_returns_previous_edge() {
    let shared = SharedState::new();
    let mut decoder = FrameDecoder::new();
    let mut interpreter = MessageInterpreter::new(&shared);
    let pin = RecordingPin::default();
    let mut correlator = TimestampCorrelator::new(&shared, pin.clone()).unwrap();

    let mut returned = Vec::new();
    for edge in 1..=4u16 {
        returned.push(correlator.request_timestamp().unwrap());
        let tow_ms = 345_600_000 + u32::from(edge) * 1_000;
        deliver(
            &mut decoder,
            &mut interpreter,
            &time_mark(edge, 2300, tow_ms, 125),
        );
    }

    assert!(returned[0].is_unset());
    for k in 1..4 {
        let tow_ms = 345_600_000 + k as u32 * 1_000;
        assert_eq!(returned[k], GpsTimestamp::from_week_tow(2300, tow_ms, 125));
    }
    assert_eq!(*pin.levels.borrow(), [false, true, false, true, false]);
}

#[test]
fn test_missing_time_mark_returns_unset() {
    let shared = SharedState::new();
    let mut decoder = FrameDecoder::new();
    let mut interpreter = MessageInterpreter::new(&shared);
    let mut correlator = TimestampCorrelator::new(&shared, RecordingPin::default()).unwrap();

    correlator.request_timestamp().unwrap();
    deliver(&mut decoder, &mut interpreter, &time_mark(1, 2300, 1_000, 0));
    assert!(!correlator.request_timestamp().unwrap().is_unset());
    // the receiver never answered the second edge
    assert!(correlator.request_timestamp().unwrap().is_unset());
}

#[test]
fn test_late_time_mark_overwrites_stale_one() {
    let shared = SharedState::new();
    let mut decoder = FrameDecoder::new();
    let mut interpreter = MessageInterpreter::new(&shared);
    let mut correlator = TimestampCorrelator::new(&shared, RecordingPin::default()).unwrap();

    correlator.request_timestamp().unwrap();
    deliver(&mut decoder, &mut interpreter, &time_mark(1, 2300, 1_000, 0));
    deliver(&mut decoder, &mut interpreter, &time_mark(1, 2300, 1_001, 0));
    assert_eq!(
        correlator.request_timestamp().unwrap(),
        GpsTimestamp::from_week_tow(2300, 1_001, 0)
    );
}

proptest! {
    #[test]
    fn test_pipeline_delay(
        week in 1u16..4000,
        marks in prop::collection::vec((0u32..604_800_000, 0u32..1_000_000), 1..20),
    ) {
        let shared = SharedState::new();
        let mut decoder = FrameDecoder::new();
        let mut interpreter = MessageInterpreter::new(&shared);
        let mut correlator = TimestampCorrelator::new(&shared, RecordingPin::default()).unwrap();

        let mut previous = GpsTimestamp::UNSET;
        for (i, (tow_ms, tow_sub_ms)) in marks.iter().enumerate() {
            let returned = correlator.request_timestamp().unwrap();
            prop_assert_eq!(returned, previous);

            let edge = i as u16 + 1;
            deliver(&mut decoder, &mut interpreter, &time_mark(edge, week, *tow_ms, *tow_sub_ms));
            previous = GpsTimestamp::from_week_tow(week, *tow_ms, *tow_sub_ms);
        }
    }
}
