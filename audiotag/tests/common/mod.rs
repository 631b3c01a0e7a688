//! Frame builders and a simulated receiver shared by the integration tests.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet, VecDeque},
    convert::Infallible,
    rc::Rc,
};

use audiotag::{
    CfgKey, CfgVal, CfgValGetRequest, CfgValSet, ConfigGroup, FrameDecoder, ReceiverLink,
    ReceiverProfile,
};
use byteorder::{LittleEndian, WriteBytesExt};
use embedded_io::ErrorKind;

/// Calculates the 8-bit Fletcher-16 checksum used by u-blox.
pub fn calculate_checksum(data: &[u8]) -> (u8, u8) {
    let mut ck_a: u8 = 0;
    let mut ck_b: u8 = 0;
    for byte in data {
        ck_a = ck_a.wrapping_add(*byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    (ck_a, ck_b)
}

/// Wraps `payload` into a complete frame
pub fn ubx_frame(class: u8, msg_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame_core = Vec::with_capacity(4 + payload.len());
    frame_core.push(class);
    frame_core.push(msg_id);
    frame_core
        .write_u16::<LittleEndian>(payload.len() as u16)
        .unwrap();
    frame_core.extend_from_slice(payload);

    let (ck_a, ck_b) = calculate_checksum(&frame_core);

    let mut final_frame = Vec::with_capacity(8 + payload.len());
    final_frame.push(0xB5);
    final_frame.push(0x62);
    final_frame.extend_from_slice(&frame_core);
    final_frame.push(ck_a);
    final_frame.push(ck_b);
    final_frame
}

/// The NAV-PVT fields the logger reads; everything else stays zero.
///
/// NAV-PVT payload is 92 bytes.
#[derive(Debug, Clone)]
pub struct NavPvtPayload {
    pub itow: u32,
    pub fix_type: u8,
    pub flags: u8,
    pub num_sv: u8,
    pub lon: i32,    // [1e-7 deg]
    pub lat: i32,    // [1e-7 deg]
    pub height: i32, // above ellipsoid [mm]
}

impl NavPvtPayload {
    pub fn fix(fix_type: u8, lat: i32, lon: i32, height: i32) -> Self {
        Self {
            itow: 0,
            fix_type,
            flags: 0x01,
            num_sv: 12,
            lon,
            lat,
            height,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut wtr = Vec::with_capacity(92);
        wtr.write_u32::<LittleEndian>(self.itow).unwrap();
        wtr.extend_from_slice(&[0; 16]); // date, time, validity, tAcc, nano
        wtr.push(self.fix_type);
        wtr.push(self.flags);
        wtr.push(0); // flags2
        wtr.push(self.num_sv);
        wtr.write_i32::<LittleEndian>(self.lon).unwrap();
        wtr.write_i32::<LittleEndian>(self.lat).unwrap();
        wtr.write_i32::<LittleEndian>(self.height).unwrap();
        wtr.write_i32::<LittleEndian>(self.height - 20_000).unwrap(); // hMSL
        wtr.write_u32::<LittleEndian>(1_500).unwrap(); // hAcc
        wtr.write_u32::<LittleEndian>(2_500).unwrap(); // vAcc
        wtr.resize(92, 0);
        wtr
    }

    pub fn to_frame(&self) -> Vec<u8> {
        ubx_frame(0x01, 0x07, &self.to_bytes())
    }
}

/// TIM-TM2 payload is 28 bytes.
#[derive(Debug, Clone, Default)]
pub struct TimTm2Payload {
    pub flags: u8,
    pub count: u16,
    pub wn_r: u16,
    pub wn_f: u16,
    pub tow_ms_r: u32,
    pub tow_sub_ms_r: u32,
    pub tow_ms_f: u32,
    pub tow_sub_ms_f: u32,
}

impl TimTm2Payload {
    /// Valid time, new rising edge
    pub fn rising(count: u16, week: u16, tow_ms: u32, tow_sub_ms: u32) -> Self {
        Self {
            flags: 0b1100_1001,
            count,
            wn_r: week,
            tow_ms_r: tow_ms,
            tow_sub_ms_r: tow_sub_ms,
            ..Default::default()
        }
    }

    /// Valid time, new falling edge
    pub fn falling(count: u16, week: u16, tow_ms: u32, tow_sub_ms: u32) -> Self {
        Self {
            flags: 0b0100_1101,
            count,
            wn_f: week,
            tow_ms_f: tow_ms,
            tow_sub_ms_f: tow_sub_ms,
            ..Default::default()
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut wtr = Vec::with_capacity(28);
        wtr.push(0); // EXTINT0
        wtr.push(self.flags);
        wtr.write_u16::<LittleEndian>(self.count).unwrap();
        wtr.write_u16::<LittleEndian>(self.wn_r).unwrap();
        wtr.write_u16::<LittleEndian>(self.wn_f).unwrap();
        wtr.write_u32::<LittleEndian>(self.tow_ms_r).unwrap();
        wtr.write_u32::<LittleEndian>(self.tow_sub_ms_r).unwrap();
        wtr.write_u32::<LittleEndian>(self.tow_ms_f).unwrap();
        wtr.write_u32::<LittleEndian>(self.tow_sub_ms_f).unwrap();
        wtr.write_u32::<LittleEndian>(25).unwrap(); // accEst
        wtr
    }

    pub fn to_frame(&self) -> Vec<u8> {
        ubx_frame(0x0d, 0x03, &self.to_bytes())
    }
}

pub fn mon_ver_frame() -> Vec<u8> {
    let mut payload = Vec::with_capacity(100);
    for (s, len) in [
        ("ROM SPG 5.10 (7b202e)", 30),
        ("000A0000", 10),
        ("FWVER=SPG 5.10", 30),
        ("PROTVER=34.10", 30),
    ] {
        let start = payload.len();
        payload.extend_from_slice(s.as_bytes());
        payload.resize(start + len, 0);
    }
    ubx_frame(0x0a, 0x04, &payload)
}

pub fn ack_frame(accepted: bool, class: u8, msg_id: u8) -> Vec<u8> {
    ubx_frame(0x05, u8::from(accepted), &[class, msg_id])
}

/// Receiver state behind the simulated link and reset line
#[derive(Debug, Default)]
pub struct SimState {
    pub config: HashMap<u32, u64>,
    /// Keys whose VALSET is answered with ACK-NAK
    pub reject: HashSet<u32>,
    pub to_host: VecDeque<u8>,
    /// Frames queued ahead of every answer, decoded by the host on the way
    pub chatter: Vec<u8>,
    pub resets: u32,
    pub delayed_ms: u64,
    pub polls: u32,
    pub valgets: Vec<Vec<u32>>,
    pub valsets: Vec<Vec<(u32, u64)>>,
    /// Largest chunk handed out per read
    pub read_chunk: usize,
}

impl SimState {
    pub fn value(&self, key: CfgKey) -> Option<u64> {
        self.config.get(&key.0).copied()
    }

    fn answer(&mut self, frame: Vec<u8>) {
        let chatter = self.chatter.clone();
        self.to_host.extend(chatter);
        self.to_host.extend(frame);
    }

    fn handle(&mut self, class: u8, msg_id: u8, payload: &[u8]) {
        match (class, msg_id) {
            (0x0a, 0x04) => {
                self.polls += 1;
                self.answer(mon_ver_frame());
            },
            (CfgValGetRequest::CLASS, CfgValGetRequest::ID) => {
                let keys: Vec<u32> = payload[4..]
                    .chunks_exact(4)
                    .map(|k| u32::from_le_bytes([k[0], k[1], k[2], k[3]]))
                    .collect();
                let mut resp = vec![0x01, payload[1], 0x00, 0x00];
                for key in &keys {
                    if let Some(value) = self.config.get(key) {
                        let size = CfgKey(*key).value_size().unwrap().to_usize();
                        resp.extend_from_slice(&key.to_le_bytes());
                        resp.extend_from_slice(&value.to_le_bytes()[..size]);
                    }
                }
                self.valgets.push(keys);
                self.answer(ubx_frame(0x06, 0x8b, &resp));
            },
            (CfgValSet::CLASS, CfgValSet::ID) => {
                let vals: Vec<CfgVal> = audiotag::CfgValIter::new(&payload[4..]).collect();
                let accepted = vals.iter().all(|v| !self.reject.contains(&v.key.0));
                if accepted {
                    for v in &vals {
                        self.config.insert(v.key.0, v.value);
                    }
                }
                self.valsets
                    .push(vals.iter().map(|v| (v.key.0, v.value)).collect());
                self.answer(ack_frame(accepted, CfgValSet::CLASS, CfgValSet::ID));
            },
            _ => {},
        }
    }
}

/// Configuration a freshly reset receiver reports: the profile, apart from
/// the items a test wants to diverge
pub fn configured_receiver(profile: &ReceiverProfile, overrides: &[(CfgKey, u64)]) -> SimState {
    let mut config = HashMap::new();
    for group in ConfigGroup::ALL {
        for val in profile.values(group) {
            config.insert(val.key.0, val.value);
        }
    }
    for (key, value) in overrides {
        config.insert(key.0, *value);
    }
    SimState {
        config,
        read_chunk: 7,
        ..Default::default()
    }
}

/// Byte link to the simulated receiver
pub struct SimLink {
    pub state: Rc<RefCell<SimState>>,
    decoder: FrameDecoder,
}

impl SimLink {
    pub fn new(state: Rc<RefCell<SimState>>) -> Self {
        Self {
            state,
            decoder: FrameDecoder::new(),
        }
    }
}

impl embedded_io::ErrorType for SimLink {
    type Error = ErrorKind;
}

impl embedded_io::Read for SimLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.to_host.is_empty() {
            return Err(ErrorKind::TimedOut);
        }
        let n = buf.len().min(state.read_chunk.max(1)).min(state.to_host.len());
        for b in buf.iter_mut().take(n) {
            *b = state.to_host.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl embedded_io::Write for SimLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for byte in buf {
            if let Some(frame) = self.decoder.feed(*byte) {
                let (class, msg_id) = (frame.class(), frame.msg_id());
                let payload = frame.payload().to_vec();
                self.state.borrow_mut().handle(class, msg_id, &payload);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl ReceiverLink for SimLink {
    fn discard_input(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().to_host.clear();
        Ok(())
    }
}

/// Reset line of the simulated receiver; pulling it low drops its output
pub struct SimResetPin(pub Rc<RefCell<SimState>>);

impl embedded_hal::digital::ErrorType for SimResetPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for SimResetPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        state.resets += 1;
        state.to_host.clear();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct SimDelay(pub Rc<RefCell<SimState>>);

impl embedded_hal::delay::DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().delayed_ms += u64::from(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().delayed_ms += u64::from(ms);
    }
}

/// Output pin remembering every level it was driven to
#[derive(Debug, Default, Clone)]
pub struct RecordingPin {
    pub levels: Rc<RefCell<Vec<bool>>>,
}

impl embedded_hal::digital::ErrorType for RecordingPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}
