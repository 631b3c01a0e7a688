use core::convert::Infallible;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};
use portable_atomic::{AtomicU32, Ordering};

use crate::{
    record::AudioRecord,
    shared::SharedState,
    time::GpsTimestamp,
};

/// One lent-out slot of the capture arena
#[derive(Debug)]
pub struct AudioBlock<'a> {
    slot: usize,
    samples: &'a mut [i16],
}

impl<'a> AudioBlock<'a> {
    pub(crate) fn new(slot: usize, samples: &'a mut [i16]) -> Self {
        Self { slot, samples }
    }

    pub(crate) fn into_parts(self) -> (usize, &'a mut [i16]) {
        (self.slot, self.samples)
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn samples(&self) -> &[i16] {
        self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [i16] {
        self.samples
    }
}

/// A captured block and the time of the edge requested right after it
#[derive(Debug)]
pub struct TaggedBlock<'a> {
    pub timestamp: GpsTimestamp,
    pub block: AudioBlock<'a>,
}

/// Single-slot, overwrite-on-publish hand-off from capture to consumer.
///
/// Publishing over an unread block drops the old one and returns its buffer
/// to the arena; the consumer only ever sees the newest block. Capture may
/// also withdraw the unread block early when it needs the buffer. Buffers
/// come back to the arena through [`Handoff::release`].
///
/// Every published block ends up either dropped or consumed:
/// `published == dropped + consumed + in_flight`.
pub struct Handoff<'a> {
    latest: Signal<CriticalSectionRawMutex, TaggedBlock<'a>>,
    recycle: Channel<CriticalSectionRawMutex, AudioBlock<'a>, 2>,
    published: AtomicU32,
    dropped: AtomicU32,
    consumed: AtomicU32,
}

impl Default for Handoff<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Handoff<'a> {
    pub const fn new() -> Self {
        Self {
            latest: Signal::new(),
            recycle: Channel::new(),
            published: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            consumed: AtomicU32::new(0),
        }
    }

    pub fn publish(&self, tagged: TaggedBlock<'a>) {
        if let Some(stale) = self.take_unread() {
            self.return_to_arena(stale);
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        self.latest.signal(tagged);
    }

    /// Withdraws the block the consumer has not picked up yet and counts it
    /// as dropped
    pub(crate) fn take_unread(&self) -> Option<AudioBlock<'a>> {
        let stale = self.latest.try_take()?;
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        log::warn!(
            "Consumer overrun, dropped block tagged {:.3} ({} so far)",
            stale.timestamp.as_secs(),
            dropped
        );
        Some(stale.block)
    }

    /// Waits for the newest block
    pub async fn receive(&self) -> TaggedBlock<'a> {
        self.latest.wait().await
    }

    pub fn try_receive(&self) -> Option<TaggedBlock<'a>> {
        self.latest.try_take()
    }

    /// Gives a consumed buffer back to the capture arena
    pub fn release(&self, block: AudioBlock<'a>) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
        self.return_to_arena(block);
    }

    fn return_to_arena(&self, block: AudioBlock<'a>) {
        // Only two blocks exist, the recycle queue holds both
        if let Err(e) = self.recycle.try_send(block) {
            log::error!("Recycle queue full, losing {:?}", e);
        }
    }

    pub(crate) fn try_reclaim(&self) -> Option<AudioBlock<'a>> {
        self.recycle.try_receive().ok()
    }

    pub(crate) async fn reclaim(&self) -> AudioBlock<'a> {
        self.recycle.receive().await
    }

    pub fn published(&self) -> u32 {
        self.published.load(Ordering::Relaxed)
    }

    /// Blocks overwritten before the consumer got to them
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Blocks the consumer took and gave back
    pub fn consumed(&self) -> u32 {
        self.consumed.load(Ordering::Relaxed)
    }

    /// Blocks published but not yet dropped or given back
    pub fn in_flight(&self) -> u32 {
        self.published()
            .saturating_sub(self.dropped())
            .saturating_sub(self.consumed())
    }
}

/// Consumer context: attaches the current position to each block and writes
/// it to the transport as a framed record
pub struct BlockForwarder<'h, 'a, 's, W> {
    handoff: &'h Handoff<'a>,
    shared: &'s SharedState,
    transport: W,
    forwarded: u32,
}

impl<'h, 'a, 's, W: embedded_io::Write> BlockForwarder<'h, 'a, 's, W> {
    pub fn new(handoff: &'h Handoff<'a>, shared: &'s SharedState, transport: W) -> Self {
        Self {
            handoff,
            shared,
            transport,
            forwarded: 0,
        }
    }

    pub fn forwarded(&self) -> u32 {
        self.forwarded
    }

    pub fn into_transport(self) -> W {
        self.transport
    }

    /// Waits for the newest block, emits it and releases its buffer.
    /// Returns the timestamp the block carried.
    pub async fn forward_one(&mut self) -> Result<GpsTimestamp, W::Error> {
        let TaggedBlock { timestamp, block } = self.handoff.receive().await;
        let record = AudioRecord {
            timestamp,
            position: self.shared.position(),
            samples: block.samples(),
        };
        let written = record.write_to(&mut self.transport);
        self.handoff.release(block);
        written?;
        self.forwarded += 1;
        Ok(timestamp)
    }

    pub async fn run(&mut self) -> Result<Infallible, W::Error> {
        loop {
            self.forward_one().await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged<'a>(slot: usize, samples: &'a mut [i16], secs: f64) -> TaggedBlock<'a> {
        TaggedBlock {
            timestamp: GpsTimestamp::from_secs(secs),
            block: AudioBlock::new(slot, samples),
        }
    }

    #[test]
    fn test_overwrite_returns_stale_buffer() {
        let mut a = [0i16; 4];
        let mut b = [0i16; 4];
        let handoff = Handoff::new();

        handoff.publish(tagged(0, &mut a, 1.0));
        handoff.publish(tagged(1, &mut b, 2.0));
        assert_eq!(handoff.dropped(), 1);
        assert_eq!(handoff.in_flight(), 1);
        assert_eq!(handoff.try_reclaim().map(|blk| blk.slot()), Some(0));

        let newest = handoff.try_receive().unwrap();
        assert_eq!(newest.timestamp.as_secs(), 2.0);
        handoff.release(newest.block);
        assert_eq!(handoff.consumed(), 1);
        assert_eq!(handoff.in_flight(), 0);
        assert_eq!(handoff.try_reclaim().map(|blk| blk.slot()), Some(1));
        assert!(handoff.try_reclaim().is_none());
    }

    #[test]
    fn test_take_unread_counts_drop() {
        let mut a = [0i16; 4];
        let handoff = Handoff::new();
        assert!(handoff.take_unread().is_none());

        handoff.publish(tagged(0, &mut a, 1.0));
        let stale = handoff.take_unread().unwrap();
        assert_eq!(stale.slot(), 0);
        assert_eq!(handoff.dropped(), 1);
        assert_eq!(handoff.in_flight(), 0);
        assert!(handoff.try_receive().is_none());
        // withdrawn blocks go straight to capture, not through the queue
        assert!(handoff.try_reclaim().is_none());
    }
}
