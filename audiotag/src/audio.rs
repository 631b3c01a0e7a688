use core::convert::Infallible;

use embedded_hal::digital::OutputPin;

use crate::{
    correlator::TimestampCorrelator,
    error::{CaptureError, PinError},
    handoff::{AudioBlock, Handoff, TaggedBlock},
};

/// Microphone front end delivering fixed-size blocks of signed 16-bit samples
pub trait AudioSource {
    type Error: core::fmt::Debug;

    /// Fills `block` completely, blocking until enough samples were captured
    fn read_block(&mut self, block: &mut [i16]) -> Result<(), Self::Error>;
}

impl<T: AudioSource + ?Sized> AudioSource for &mut T {
    type Error = T::Error;

    fn read_block(&mut self, block: &mut [i16]) -> Result<(), Self::Error> {
        T::read_block(self, block)
    }
}

/// Two equally sized sample buffers, lent out alternately.
///
/// Capture never waits on a slow consumer: when both buffers are out, the one
/// still unread in the hand-off is withdrawn and overwritten. Only a buffer the
/// consumer is actually reading is left alone.
pub struct DoubleBuffer<'a> {
    slots: [Option<&'a mut [i16]>; 2],
    next: usize,
}

impl<'a> DoubleBuffer<'a> {
    pub fn new(first: &'a mut [i16], second: &'a mut [i16]) -> Self {
        debug_assert_eq!(first.len(), second.len());
        Self {
            slots: [Some(first), Some(second)],
            next: 0,
        }
    }

    /// Slot the next `acquire` prefers
    pub fn next_slot(&self) -> usize {
        self.next
    }

    pub fn available(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub async fn acquire(&mut self, handoff: &Handoff<'a>) -> AudioBlock<'a> {
        while let Some(block) = handoff.try_reclaim() {
            self.put_back(block);
        }
        if self.available() == 0 {
            if let Some(stale) = handoff.take_unread() {
                self.put_back(stale);
            }
        }
        loop {
            if let Some(block) = self.take_free() {
                return block;
            }
            // the consumer is between taking its block and releasing it
            let block = handoff.reclaim().await;
            self.put_back(block);
        }
    }

    fn take_free(&mut self) -> Option<AudioBlock<'a>> {
        let slot = [self.next, self.next ^ 1]
            .into_iter()
            .find(|&slot| self.slots[slot].is_some())?;
        let samples = self.slots[slot].take()?;
        self.next = slot ^ 1;
        Some(AudioBlock::new(slot, samples))
    }

    pub fn put_back(&mut self, block: AudioBlock<'a>) {
        let (slot, samples) = block.into_parts();
        self.slots[slot] = Some(samples);
    }
}

/// Capture context: fills the next arena slot, requests the edge timestamp
/// right after the block completes and publishes the pair.
pub struct AudioCapture<'h, 'a, 's, S, P> {
    source: S,
    arena: DoubleBuffer<'a>,
    correlator: TimestampCorrelator<'s, P>,
    handoff: &'h Handoff<'a>,
    captured: u32,
    started: bool,
}

impl<'h, 'a, 's, S, P> AudioCapture<'h, 'a, 's, S, P>
where
    S: AudioSource,
    P: OutputPin,
{
    pub fn new(
        source: S,
        arena: DoubleBuffer<'a>,
        correlator: TimestampCorrelator<'s, P>,
        handoff: &'h Handoff<'a>,
    ) -> Self {
        Self {
            source,
            arena,
            correlator,
            handoff,
            captured: 0,
            started: false,
        }
    }

    pub fn captured(&self) -> u32 {
        self.captured
    }

    /// Sends the edge that marks the start of the first block.
    ///
    /// Each request returns the time of the edge before it, so without this
    /// the first block would go out untagged. Runs on the first capture when
    /// not called before.
    pub fn start(&mut self) -> Result<(), PinError> {
        if !self.started {
            // nothing was requested before, there is no mark to keep
            self.correlator.request_timestamp()?;
            self.started = true;
            log::debug!("Capture started");
        }
        Ok(())
    }

    pub async fn capture_one(&mut self) -> Result<(), CaptureError<S::Error>> {
        self.start()?;
        let mut block = self.arena.acquire(self.handoff).await;
        if let Err(e) = self.source.read_block(block.samples_mut()) {
            self.arena.put_back(block);
            return Err(CaptureError::Source(e));
        }
        let timestamp = match self.correlator.request_timestamp() {
            Ok(ts) => ts,
            Err(e) => {
                self.arena.put_back(block);
                return Err(e.into());
            },
        };
        self.captured += 1;
        log::debug!(
            "Block {} in slot {} tagged {:.3}",
            self.captured,
            block.slot(),
            timestamp.as_secs()
        );
        self.handoff.publish(TaggedBlock { timestamp, block });
        Ok(())
    }

    pub async fn run(&mut self) -> Result<Infallible, CaptureError<S::Error>> {
        loop {
            self.capture_one().await?;
        }
    }
}
