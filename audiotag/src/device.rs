use core::convert::Infallible;

use embedded_hal::{delay::DelayNs, digital::OutputPin};
use embedded_io::{Error as _, ErrorKind, Read, Write};

use crate::{
    constants::{RESET_HOLD_MS, UBX_MAX_FRAME_LEN},
    error::{Error, PinError},
    interpreter::MessageInterpreter,
    parser::{DecoderStats, FrameDecoder},
    shared::SharedState,
    ubx_packets::{
        encode_frame, Ack, CfgKey, CfgVal, CfgValGetRequest, CfgValGetResponse, CfgValSet,
        MessageKind, MonVer, MON_VER_POLL,
    },
};

const RX_CHUNK: usize = 64;

/// Serial link to the receiver.
///
/// A read that times out, or returns zero bytes, only means nothing arrived
/// yet.
pub trait ReceiverLink: Read + Write {
    /// Drops input the receiver already sent but nobody read
    fn discard_input(&mut self) -> Result<(), Self::Error>;
}

/// The GPS link context: owns the link, the frame decoder, the interpreter
/// and the reset line.
pub struct Device<'s, L, R, D> {
    link: L,
    reset: R,
    delay: D,
    decoder: FrameDecoder,
    interpreter: MessageInterpreter<'s>,
    rx: [u8; RX_CHUNK],
    rx_pos: usize,
    rx_len: usize,
    tx: [u8; UBX_MAX_FRAME_LEN],
}

impl<'s, L, R, D> Device<'s, L, R, D>
where
    L: ReceiverLink,
    R: OutputPin,
    D: DelayNs,
{
    pub fn new(link: L, reset: R, delay: D, shared: &'s SharedState) -> Self {
        Self {
            link,
            reset,
            delay,
            decoder: FrameDecoder::new(),
            interpreter: MessageInterpreter::new(shared),
            rx: [0; RX_CHUNK],
            rx_pos: 0,
            rx_len: 0,
            tx: [0; UBX_MAX_FRAME_LEN],
        }
    }

    pub fn shared(&self) -> &'s SharedState {
        self.interpreter.shared()
    }

    pub fn interpreter(&self) -> &MessageInterpreter<'s> {
        &self.interpreter
    }

    pub fn decoder_stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn release(self) -> (L, R, D) {
        (self.link, self.reset, self.delay)
    }

    /// Feeds buffered and newly read bytes to the decoder until one frame
    /// completes. `Ok(None)` when the link had nothing more to give.
    pub fn poll(&mut self) -> Result<Option<MessageKind>, Error<L::Error>> {
        loop {
            while self.rx_pos < self.rx_len {
                let byte = self.rx[self.rx_pos];
                self.rx_pos += 1;
                if let Some(frame) = self.decoder.feed(byte) {
                    return Ok(Some(self.interpreter.interpret(&frame)));
                }
            }
            match self.link.read(&mut self.rx) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    self.rx_pos = 0;
                    self.rx_len = n;
                },
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(e) => return Err(Error::Link(e)),
            }
        }
    }

    /// GPS read loop, keeps the shared position and pending timestamp current
    pub fn run(&mut self) -> Result<Infallible, Error<L::Error>> {
        loop {
            self.poll()?;
        }
    }

    pub fn send(&mut self, class: u8, msg_id: u8, payload: &[u8]) -> Result<(), Error<L::Error>> {
        let len = encode_frame(class, msg_id, payload, &mut self.tx).map_err(|_| {
            Error::CommandTooLong {
                payload_len: payload.len(),
            }
        })?;
        log::trace!("Sending class {:#04x} id {:#04x} len {}", class, msg_id, payload.len());
        self.link.write_all(&self.tx[..len]).map_err(Error::Link)?;
        self.link.flush().map_err(Error::Link)
    }

    /// Waits until `matcher` picks a message. Silence on the link only
    /// pauses the wait; every frame is still interpreted on the way.
    pub fn await_response<T>(
        &mut self,
        mut matcher: impl FnMut(MessageKind) -> Option<T>,
    ) -> Result<T, Error<L::Error>> {
        loop {
            if let Some(found) = self.poll()?.and_then(&mut matcher) {
                return Ok(found);
            }
        }
    }

    /// Drops pending link input and any partial frame
    pub fn resync(&mut self) -> Result<(), Error<L::Error>> {
        self.link.discard_input().map_err(Error::Link)?;
        self.rx_pos = 0;
        self.rx_len = 0;
        self.decoder.reset();
        Ok(())
    }

    /// Polls MON-VER until the receiver answers
    pub fn probe_version(&mut self) -> Result<MonVer, Error<L::Error>> {
        self.resync()?;
        self.send(MON_VER_POLL.0, MON_VER_POLL.1, &[])?;
        self.await_response(|kind| match kind {
            MessageKind::Version(ver) => Some(ver),
            _ => None,
        })
    }

    /// CFG-VALGET of `keys` from the RAM layer
    pub fn query(&mut self, keys: &[CfgKey]) -> Result<CfgValGetResponse, Error<L::Error>> {
        let payload = CfgValGetRequest::new(keys)
            .payload()
            .map_err(|_| Error::CommandTooLong {
                payload_len: 4 + 4 * keys.len(),
            })?;
        self.send(CfgValGetRequest::CLASS, CfgValGetRequest::ID, &payload)?;
        let reply = self.await_response(|kind| match kind {
            MessageKind::ConfigValue(resp) => Some(Ok(resp)),
            MessageKind::ConfigAck(ack)
                if !ack.accepted && ack.is_for(CfgValGetRequest::CLASS, CfgValGetRequest::ID) =>
            {
                Some(Err(ack))
            },
            _ => None,
        })?;
        reply.map_err(rejected)
    }

    /// CFG-VALSET of `values` and wait for its acknowledgement
    pub fn apply(&mut self, values: &[CfgVal]) -> Result<(), Error<L::Error>> {
        let payload = CfgValSet::new(values)
            .payload()
            .map_err(|_| Error::CommandTooLong {
                payload_len: 4 + values.iter().map(CfgVal::encoded_len).sum::<usize>(),
            })?;
        self.send(CfgValSet::CLASS, CfgValSet::ID, &payload)?;
        let ack = self.await_response(|kind| match kind {
            MessageKind::ConfigAck(ack) if ack.is_for(CfgValSet::CLASS, CfgValSet::ID) => Some(ack),
            _ => None,
        })?;
        if ack.accepted {
            Ok(())
        } else {
            Err(rejected(ack))
        }
    }

    /// Holds the reset line low, releases it and forgets the fix history
    pub fn hardware_reset(&mut self) -> Result<(), Error<L::Error>> {
        log::info!("Resetting receiver");
        self.reset.set_low().map_err(PinError::from_hal)?;
        self.delay.delay_ms(RESET_HOLD_MS);
        self.reset.set_high().map_err(PinError::from_hal)?;
        self.interpreter.reset_fix_latch();
        Ok(())
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

fn rejected<E>(ack: Ack) -> Error<E> {
    Error::Rejected {
        class: ack.class,
        msg_id: ack.msg_id,
    }
}
