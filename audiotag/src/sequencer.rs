//! Startup handshake that brings the receiver to the required configuration.
//!
//! Groups whose corrections only take effect after a reset (LNA gain and L5
//! availability) restart the handshake from the liveness probe; the other
//! groups are corrected in place.

use embedded_hal::{delay::DelayNs, digital::OutputPin};

use crate::{
    constants::SIGNAL_SETTLE_MS,
    device::{Device, ReceiverLink},
    error::Error,
    profile::{ConfigGroup, KeyName, ReceiverProfile},
    ubx_packets::MonVer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    ProbingLiveness,
    VerifyingGain,
    VerifyingInterfaces,
    VerifyingSignals,
    VerifyingL5Availability,
    VerifyingMessageAndNavConfig,
    Ready,
}

/// Outcome of a completed handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequencerReport {
    /// Hardware resets issued, the initial one included
    pub resets: u32,
    /// Configuration items written
    pub corrections: u32,
    /// Identification from the last liveness probe
    pub version: Option<MonVer>,
}

pub struct ConfigSequencer<'p> {
    profile: &'p ReceiverProfile,
    state: SequencerState,
    report: SequencerReport,
}

impl<'p> ConfigSequencer<'p> {
    pub fn new(profile: &'p ReceiverProfile) -> Self {
        Self {
            profile,
            state: SequencerState::ProbingLiveness,
            report: SequencerReport::default(),
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn report(&self) -> &SequencerReport {
        &self.report
    }

    /// Resets the receiver to its power-on state, then steps until `Ready`
    pub fn run<L, R, D>(
        mut self,
        device: &mut Device<'_, L, R, D>,
    ) -> Result<SequencerReport, Error<L::Error>>
    where
        L: ReceiverLink,
        R: OutputPin,
        D: DelayNs,
    {
        device.shared().clear_timestamp();
        self.reset(device)?;
        while self.step(device)? != SequencerState::Ready {}
        log::info!(
            "Receiver configured after {} reset(s) and {} correction(s)",
            self.report.resets,
            self.report.corrections
        );
        Ok(self.report)
    }

    /// Performs the exchange of the current state and moves to the next one
    pub fn step<L, R, D>(
        &mut self,
        device: &mut Device<'_, L, R, D>,
    ) -> Result<SequencerState, Error<L::Error>>
    where
        L: ReceiverLink,
        R: OutputPin,
        D: DelayNs,
    {
        self.state = match self.state {
            SequencerState::ProbingLiveness => {
                let version = device.probe_version()?;
                log::info!(
                    "Receiver alive: software {:?}, hardware {:?}, protocol {}",
                    version.software_version.as_str(),
                    version.hardware_version.as_str(),
                    version.extension("PROTVER").unwrap_or("unknown")
                );
                self.report.version = Some(version);
                SequencerState::VerifyingGain
            },
            SequencerState::VerifyingGain => {
                self.verify(device, ConfigGroup::Gain, SequencerState::VerifyingInterfaces)?
            },
            SequencerState::VerifyingInterfaces => {
                self.correct(device, ConfigGroup::Interfaces)?;
                SequencerState::VerifyingSignals
            },
            SequencerState::VerifyingSignals => {
                if self.correct(device, ConfigGroup::Signals)? {
                    device.delay_ms(SIGNAL_SETTLE_MS);
                }
                SequencerState::VerifyingL5Availability
            },
            SequencerState::VerifyingL5Availability => self.verify(
                device,
                ConfigGroup::L5Availability,
                SequencerState::VerifyingMessageAndNavConfig,
            )?,
            SequencerState::VerifyingMessageAndNavConfig => {
                self.correct(device, ConfigGroup::Messages)?;
                self.correct(device, ConfigGroup::Navigation)?;
                SequencerState::Ready
            },
            SequencerState::Ready => SequencerState::Ready,
        };
        Ok(self.state)
    }

    /// Corrects `group`; a group that needs a reset to apply restarts the
    /// handshake, otherwise it continues with `next`
    fn verify<L, R, D>(
        &mut self,
        device: &mut Device<'_, L, R, D>,
        group: ConfigGroup,
        next: SequencerState,
    ) -> Result<SequencerState, Error<L::Error>>
    where
        L: ReceiverLink,
        R: OutputPin,
        D: DelayNs,
    {
        if self.correct(device, group)? && group.needs_reset() {
            self.reset(device)?;
            return Ok(SequencerState::ProbingLiveness);
        }
        Ok(next)
    }

    fn reset<L, R, D>(&mut self, device: &mut Device<'_, L, R, D>) -> Result<(), Error<L::Error>>
    where
        L: ReceiverLink,
        R: OutputPin,
        D: DelayNs,
    {
        device.hardware_reset()?;
        self.report.resets += 1;
        self.state = SequencerState::ProbingLiveness;
        Ok(())
    }

    /// Queries `group`, writes back what diverges; `true` if anything was written
    fn correct<L, R, D>(
        &mut self,
        device: &mut Device<'_, L, R, D>,
        group: ConfigGroup,
    ) -> Result<bool, Error<L::Error>>
    where
        L: ReceiverLink,
        R: OutputPin,
        D: DelayNs,
    {
        let reported = device.query(&self.profile.keys(group))?;
        let divergent = self.profile.divergent(group, &reported);
        if divergent.is_empty() {
            log::debug!("{} configuration matches", group);
            return Ok(false);
        }
        for val in &divergent {
            log::warn!("{}: setting {} to {}", group, KeyName(val.key), val.value);
        }
        device.apply(&divergent)?;
        self.report.corrections += divergent.len() as u32;
        Ok(true)
    }
}
