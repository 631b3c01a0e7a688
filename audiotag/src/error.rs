use core::fmt;

/// Error that possible during packets parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserError {
    InvalidChecksum {
        expect: u16,
        got: u16,
    },
    InvalidField {
        packet: &'static str,
        field: &'static str,
    },
    InvalidPacketLen {
        packet: &'static str,
        expect: usize,
        got: usize,
    },
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::InvalidChecksum { expect, got } => write!(
                f,
                "Not valid packet's checksum, expect {:x}, got {:x}",
                expect, got
            ),
            ParserError::InvalidField { packet, field } => {
                write!(f, "Invalid field {} of packet {}", field, packet)
            },
            ParserError::InvalidPacketLen {
                packet,
                expect,
                got,
            } => write!(
                f,
                "Invalid packet({}) length, expect {}, got {}",
                packet, expect, got
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParserError {}

/// Failure to drive one of the receiver control lines (EXTINT or RESET)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinError(pub embedded_hal::digital::ErrorKind);

impl PinError {
    pub(crate) fn from_hal<E: embedded_hal::digital::Error>(e: E) -> Self {
        Self(e.kind())
    }
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "control line error: {:?}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PinError {}

/// Errors surfaced by the receiver link and the configuration handshake.
///
/// Framing errors and unrelated messages never show up here, the decoder
/// resynchronises on its own and the handshake keeps waiting.
#[derive(Debug)]
pub enum Error<E> {
    /// The serial link failed with something other than a read timeout
    Link(E),
    /// The reset line could not be driven
    Pin(PinError),
    /// The receiver answered a configuration command with ACK-NAK
    Rejected { class: u8, msg_id: u8 },
    /// A command did not fit in the frame buffer
    CommandTooLong { payload_len: usize },
}

impl<E> From<PinError> for Error<E> {
    fn from(e: PinError) -> Self {
        Self::Pin(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Link(e) => write!(f, "receiver link error: {:?}", e),
            Error::Pin(e) => write!(f, "{}", e),
            Error::Rejected { class, msg_id } => write!(
                f,
                "receiver rejected command class {:#04x} id {:#04x}",
                class, msg_id
            ),
            Error::CommandTooLong { payload_len } => {
                write!(f, "command payload of {} bytes is too long", payload_len)
            },
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}

/// Errors from the audio capture context
#[derive(Debug)]
pub enum CaptureError<E> {
    /// The audio source failed to deliver a block
    Source(E),
    /// The edge-trigger line could not be toggled
    Pin(PinError),
}

impl<E> From<PinError> for CaptureError<E> {
    fn from(e: PinError) -> Self {
        Self::Pin(e)
    }
}

impl<E: fmt::Debug> fmt::Display for CaptureError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Source(e) => write!(f, "audio source error: {:?}", e),
            CaptureError::Pin(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for CaptureError<E> {}
