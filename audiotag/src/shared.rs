use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use portable_atomic::{AtomicU64, Ordering};

use crate::time::GpsTimestamp;

/// Last accepted receiver position, WGS84
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Latitude in degrees
    pub lat: f32,
    /// Longitude in degrees
    pub lon: f32,
    /// Height above ellipsoid in meters
    pub height: f32,
}

impl Position {
    pub const ZERO: Self = Self {
        lat: 0.0,
        lon: 0.0,
        height: 0.0,
    };
}

/// State written by the GPS link context and read by the audio contexts.
///
/// The position triple is swapped under a critical section so a reader never
/// observes a half-written fix. The pending timestamp is a single 64-bit
/// word holding the bits of an `f64`; taking it leaves [`GpsTimestamp::UNSET`]
/// behind.
pub struct SharedState {
    position: Mutex<CriticalSectionRawMutex, Cell<Position>>,
    pending_timestamp: AtomicU64,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            position: Mutex::new(Cell::new(Position::ZERO)),
            pending_timestamp: AtomicU64::new(0),
        }
    }

    pub fn position(&self) -> Position {
        self.position.lock(Cell::get)
    }

    pub fn set_position(&self, position: Position) {
        self.position.lock(|p| p.set(position));
    }

    /// Replaces the pending timestamp, an unread one is lost
    pub fn store_timestamp(&self, ts: GpsTimestamp) {
        self.pending_timestamp.store(ts.to_bits(), Ordering::Release);
    }

    /// Read-and-clear of the pending timestamp
    pub fn take_timestamp(&self) -> GpsTimestamp {
        GpsTimestamp::from_bits(
            self.pending_timestamp
                .swap(GpsTimestamp::UNSET.to_bits(), Ordering::AcqRel),
        )
    }

    /// Puts a taken timestamp back unless a newer one arrived meanwhile
    pub fn restore_timestamp(&self, ts: GpsTimestamp) {
        let _ = self.pending_timestamp.compare_exchange(
            GpsTimestamp::UNSET.to_bits(),
            ts.to_bits(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn clear_timestamp(&self) {
        self.store_timestamp(GpsTimestamp::UNSET);
    }
}
