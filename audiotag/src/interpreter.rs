use crate::{
    parser::Frame,
    shared::SharedState,
    ubx_packets::{GpsFix, MessageKind, NavPvt, TimTm2},
};

/// Applies validated frames to the shared position snapshot and the pending
/// timestamp.
///
/// A 2D fix only moves the position until the first 3D fix after a receiver
/// reset; from then on 3D fixes alone are trusted.
pub struct MessageInterpreter<'s> {
    shared: &'s SharedState,
    three_d_seen: bool,
}

impl<'s> MessageInterpreter<'s> {
    pub fn new(shared: &'s SharedState) -> Self {
        Self {
            shared,
            three_d_seen: false,
        }
    }

    pub fn shared(&self) -> &'s SharedState {
        self.shared
    }

    pub fn has_3d_fix(&self) -> bool {
        self.three_d_seen
    }

    /// Forgets any 3D fix, called after the receiver was reset
    pub fn reset_fix_latch(&mut self) {
        self.three_d_seen = false;
    }

    pub fn interpret(&mut self, frame: &Frame<'_>) -> MessageKind {
        let kind = MessageKind::classify(frame);
        match &kind {
            MessageKind::PositionFix(pvt) => self.on_position_fix(pvt),
            MessageKind::TimeMark(tm) => self.on_time_mark(tm),
            MessageKind::Unknown { class, msg_id, len } => {
                log::trace!(
                    "Ignoring frame class {:#04x} id {:#04x} len {}",
                    class,
                    msg_id,
                    len
                );
            },
            MessageKind::ConfigValue(_) | MessageKind::ConfigAck(_) | MessageKind::Version(_) => {},
        }
        kind
    }

    fn on_position_fix(&mut self, pvt: &NavPvt) {
        if !pvt.gnss_fix_ok() {
            return;
        }
        let accept = match pvt.fix_type {
            GpsFix::Fix3D => true,
            GpsFix::Fix2D => !self.three_d_seen,
            _ => false,
        };
        if !accept {
            return;
        }
        if pvt.fix_type == GpsFix::Fix3D && !self.three_d_seen {
            log::info!("First 3D fix with {} satellites", pvt.num_satellites);
            self.three_d_seen = true;
        }
        self.shared.set_position(pvt.position());
    }

    fn on_time_mark(&mut self, tm: &TimTm2) {
        match tm.edge_timestamp() {
            Some(ts) => {
                log::debug!("Time mark #{} at {:.9} s", tm.count, ts.as_secs());
                self.shared.store_timestamp(ts);
            },
            None => log::debug!("Time mark #{} without a valid edge time", tm.count),
        }
    }
}
