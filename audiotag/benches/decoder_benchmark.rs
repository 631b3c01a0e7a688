use std::hint::black_box;

use audiotag::{encode_frame, FrameDecoder, MessageInterpreter, SharedState, UBX_MAX_FRAME_LEN};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::RngExt;

fn frame(class: u8, msg_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = [0u8; UBX_MAX_FRAME_LEN];
    let len = encode_frame(class, msg_id, payload, &mut out).unwrap();
    out[..len].to_vec()
}

/// One second of receiver output at the configured rates: two NAV-PVT
/// solutions, one time mark and some line noise
fn receiver_stream(seconds: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut pvt = [0u8; 92];
    pvt[20] = 3;
    pvt[21] = 0x01;
    pvt[28..32].copy_from_slice(&473_977_000i32.to_le_bytes());
    let mut tm2 = [0u8; 28];
    tm2[1] = 0b1100_1001;
    tm2[4..6].copy_from_slice(&2300u16.to_le_bytes());

    let mut data = Vec::new();
    for second in 0..seconds {
        tm2[8..12].copy_from_slice(&(second as u32 * 1_000).to_le_bytes());
        data.extend(frame(0x01, 0x07, &pvt));
        data.extend(frame(0x0d, 0x03, &tm2));
        data.extend(frame(0x01, 0x07, &pvt));
        let noise: usize = rng.random_range(0..16);
        data.extend((0..noise).map(|_| rng.random_range(0..0xb5u8)));
    }
    data
}

fn decode_all(data: &[u8]) -> usize {
    let mut decoder = FrameDecoder::new();
    let mut count = 0;
    for byte in data {
        if let Some(frame) = decoder.feed(*byte) {
            count += frame.len();
        }
    }
    count
}

fn interpret_all(data: &[u8]) -> f64 {
    let shared = SharedState::new();
    let mut decoder = FrameDecoder::new();
    let mut interpreter = MessageInterpreter::new(&shared);
    for byte in data {
        if let Some(frame) = decoder.feed(*byte) {
            interpreter.interpret(&frame);
        }
    }
    shared.take_timestamp().as_secs()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    for seconds in [1, 60, 600] {
        let data = receiver_stream(seconds);
        c.bench_function(&format!("decode_{}s", seconds), |b| {
            b.iter(|| decode_all(black_box(&data)))
        });
        c.bench_function(&format!("interpret_{}s", seconds), |b| {
            b.iter(|| interpret_all(black_box(&data)))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
