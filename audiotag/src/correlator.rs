use embedded_hal::digital::OutputPin;

use crate::{error::PinError, shared::SharedState, time::GpsTimestamp};

/// Drives the receiver's EXTINT input and hands back edge times.
///
/// Every request toggles the line, the receiver time-tags that edge and the
/// GPS link context stores the answer as the pending timestamp. The answer
/// arrives long after the request returns, so request `k` returns the time of
/// edge `k - 1` and the first request returns [`GpsTimestamp::UNSET`].
pub struct TimestampCorrelator<'s, P> {
    shared: &'s SharedState,
    extint: P,
    high: bool,
}

impl<'s, P: OutputPin> TimestampCorrelator<'s, P> {
    /// Takes the edge-trigger line and parks it low
    pub fn new(shared: &'s SharedState, mut extint: P) -> Result<Self, PinError> {
        extint.set_low().map_err(PinError::from_hal)?;
        Ok(Self {
            shared,
            extint,
            high: false,
        })
    }

    pub fn request_timestamp(&mut self) -> Result<GpsTimestamp, PinError> {
        let previous = self.shared.take_timestamp();
        let driven = if self.high {
            self.extint.set_low()
        } else {
            self.extint.set_high()
        };
        if let Err(e) = driven {
            // no edge went out, the mark still belongs to the next request
            self.shared.restore_timestamp(previous);
            return Err(PinError::from_hal(e));
        }
        self.high = !self.high;
        Ok(previous)
    }

    pub fn release(self) -> P {
        self.extint
    }
}
