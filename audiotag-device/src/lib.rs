//! Host-side glue between `audiotag` and real hardware: a serial port to the
//! receiver whose modem lines double as the EXTINT and RESET outputs, and a
//! raw PCM stream standing in for the microphone.

use std::{
    io,
    thread,
    time::{Duration, Instant},
};

use byteorder::{LittleEndian, ReadBytesExt};
use serialport::{ClearBuffer, SerialPort};

pub mod cli;
pub use audiotag;

/// Receiver serial link over `serialport`.
///
/// Port timeouts surface as `io::ErrorKind::TimedOut`, which the receiver
/// context treats as "nothing arrived yet".
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &dyn SerialPort {
        self.port.as_ref()
    }
}

impl embedded_io::ErrorType for SerialLink {
    type Error = io::Error;
}

impl embedded_io::Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        io::Read::read(&mut self.port, buf)
    }
}

impl embedded_io::Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        io::Write::write(&mut self.port, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        io::Write::flush(&mut self.port)
    }
}

impl audiotag::ReceiverLink for SerialLink {
    fn discard_input(&mut self) -> Result<(), Self::Error> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Modem control output of the serial port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Data terminal ready, wired to EXTINT
    Dtr,
    /// Request to send, wired to RESET_N
    Rts,
}

#[derive(Debug)]
pub struct LineError(pub serialport::Error);

impl embedded_hal::digital::Error for LineError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

/// One modem control line driven as a digital output
pub struct ControlLine {
    port: Box<dyn SerialPort>,
    signal: ControlSignal,
    inverted: bool,
}

impl ControlLine {
    pub fn new(port: Box<dyn SerialPort>, signal: ControlSignal) -> Self {
        Self {
            port,
            signal,
            inverted: false,
        }
    }

    /// For adapters whose level shifter inverts the modem lines
    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    fn drive(&mut self, high: bool) -> Result<(), LineError> {
        let level = high != self.inverted;
        match self.signal {
            ControlSignal::Dtr => self.port.write_data_terminal_ready(level),
            ControlSignal::Rts => self.port.write_request_to_send(level),
        }
        .map_err(LineError)
    }
}

impl embedded_hal::digital::ErrorType for ControlLine {
    type Error = LineError;
}

impl embedded_hal::digital::OutputPin for ControlLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

/// The receiver link plus its EXTINT and RESET lines, each on its own handle
/// to the same port
pub fn split_port(
    port: Box<dyn SerialPort>,
    inverted_lines: bool,
) -> serialport::Result<(SerialLink, ControlLine, ControlLine)> {
    let extint = ControlLine::new(port.try_clone()?, ControlSignal::Dtr).inverted(inverted_lines);
    let reset = ControlLine::new(port.try_clone()?, ControlSignal::Rts).inverted(inverted_lines);
    Ok((SerialLink::new(port), extint, reset))
}

/// Blocking delay on the host clock
#[derive(Debug, Default, Clone, Copy)]
pub struct HostDelay;

impl embedded_hal::delay::DelayNs for HostDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Signed 16-bit little-endian mono PCM, e.g. `arecord -f S16_LE -t raw`
pub struct PcmSource<R> {
    reader: R,
    block_period: Option<Duration>,
    next_deadline: Option<Instant>,
}

impl<R: io::Read> PcmSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            block_period: None,
            next_deadline: None,
        }
    }

    /// Hands out blocks no faster than a live microphone would, for replaying
    /// recordings from a file
    pub fn paced(mut self, block_period: Duration) -> Self {
        self.block_period = Some(block_period);
        self
    }
}

impl<R: io::Read> audiotag::AudioSource for PcmSource<R> {
    type Error = io::Error;

    fn read_block(&mut self, block: &mut [i16]) -> Result<(), Self::Error> {
        self.reader.read_i16_into::<LittleEndian>(block)?;
        if let Some(period) = self.block_period {
            let deadline = self.next_deadline.unwrap_or_else(Instant::now) + period;
            if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
            self.next_deadline = Some(deadline);
        }
        Ok(())
    }
}

/// `embedded_io::Write` over any `std::io::Write`
pub struct IoWriter<W>(pub W);

impl<W: io::Write> embedded_io::ErrorType for IoWriter<W> {
    type Error = io::Error;
}

impl<W: io::Write> embedded_io::Write for IoWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiotag::AudioSource;

    #[test]
    fn test_pcm_source_reads_little_endian() {
        let bytes = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0xff, 0x7f];
        let mut source = PcmSource::new(&bytes[..]);
        let mut block = [0i16; 4];
        source.read_block(&mut block).unwrap();
        assert_eq!(block, [1, -1, i16::MIN, i16::MAX]);
        // nothing left for a second block
        let err = source.read_block(&mut block).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_io_writer_forwards_bytes() {
        let mut out = IoWriter(Vec::new());
        embedded_io::Write::write_all(&mut out, &[1, 2, 3]).unwrap();
        embedded_io::Write::flush(&mut out).unwrap();
        assert_eq!(out.0, [1, 2, 3]);
    }
}
