//! Transport framing of tagged audio blocks.
//!
//! ```text
//! 7E 6F 50 11 | timestamp f64 | lat f32 | lon f32 | height f32 | samples i16 * n
//! ```
//! All fields little-endian. The sample count is not on the wire, both ends
//! agree on the block length.

use crate::{
    constants::{RECORD_DELIMITER, RECORD_HEADER_LEN},
    shared::Position,
    time::GpsTimestamp,
};

const SAMPLE_CHUNK: usize = 128;

/// One block as it leaves the consumer
#[derive(Debug, Clone, Copy)]
pub struct AudioRecord<'b> {
    pub timestamp: GpsTimestamp,
    pub position: Position,
    pub samples: &'b [i16],
}

impl AudioRecord<'_> {
    pub fn encoded_len(&self) -> usize {
        RECORD_HEADER_LEN + 2 * self.samples.len()
    }

    pub fn header(&self) -> [u8; RECORD_HEADER_LEN] {
        let mut out = [0u8; RECORD_HEADER_LEN];
        out[0..4].copy_from_slice(&RECORD_DELIMITER);
        out[4..12].copy_from_slice(&self.timestamp.as_secs().to_le_bytes());
        out[12..16].copy_from_slice(&self.position.lat.to_le_bytes());
        out[16..20].copy_from_slice(&self.position.lon.to_le_bytes());
        out[20..24].copy_from_slice(&self.position.height.to_le_bytes());
        out
    }

    pub fn write_to<W: embedded_io::Write>(&self, out: &mut W) -> Result<(), W::Error> {
        out.write_all(&self.header())?;
        let mut buf = [0u8; 2 * SAMPLE_CHUNK];
        for chunk in self.samples.chunks(SAMPLE_CHUNK) {
            for (dst, sample) in buf.chunks_exact_mut(2).zip(chunk) {
                dst.copy_from_slice(&sample.to_le_bytes());
            }
            out.write_all(&buf[..2 * chunk.len()])?;
        }
        out.flush()
    }

    #[cfg(feature = "alloc")]
    pub fn to_vec(&self) -> alloc::vec::Vec<u8> {
        let mut out = alloc::vec::Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.header());
        for sample in self.samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }
}

/// A record decoded in place from a received byte stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordView<'b> {
    pub timestamp: GpsTimestamp,
    pub position: Position,
    raw_samples: &'b [u8],
}

impl<'b> RecordView<'b> {
    pub fn sample_count(&self) -> usize {
        self.raw_samples.len() / 2
    }

    pub fn samples(&self) -> impl Iterator<Item = i16> + 'b {
        self.raw_samples
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
    }
}

/// Pulls fixed-length records out of a byte stream, skipping anything in
/// front of a delimiter
#[derive(Debug, Clone)]
pub struct RecordReader {
    sample_count: usize,
    skipped: usize,
}

impl RecordReader {
    pub fn new(sample_count: usize) -> Self {
        Self {
            sample_count,
            skipped: 0,
        }
    }

    pub fn record_len(&self) -> usize {
        RECORD_HEADER_LEN + 2 * self.sample_count
    }

    /// Bytes discarded while hunting for a delimiter
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Looks for the first complete record in `buf`.
    ///
    /// Returns the record, if any, and how many leading bytes of `buf` the
    /// caller may drop. Bytes that could still begin a record are never
    /// counted as consumed.
    pub fn next_record<'b>(&mut self, buf: &'b [u8]) -> (Option<RecordView<'b>>, usize) {
        let Some(start) = buf
            .windows(RECORD_DELIMITER.len())
            .position(|w| w == RECORD_DELIMITER)
        else {
            let keep = (RECORD_DELIMITER.len() - 1).min(buf.len());
            let consumed = buf.len() - keep;
            self.skipped += consumed;
            return (None, consumed);
        };
        self.skipped += start;
        let end = start + self.record_len();
        if buf.len() < end {
            return (None, start);
        }
        let rec = &buf[start..end];
        let f32_at = |at: usize| f32::from_le_bytes([rec[at], rec[at + 1], rec[at + 2], rec[at + 3]]);
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&rec[4..12]);
        let view = RecordView {
            timestamp: GpsTimestamp::from_secs(f64::from_le_bytes(ts)),
            position: Position {
                lat: f32_at(12),
                lon: f32_at(16),
                height: f32_at(20),
            },
            raw_samples: &rec[RECORD_HEADER_LEN..],
        };
        (Some(view), end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_bytes(samples: &[i16]) -> Vec<u8> {
        let record = AudioRecord {
            timestamp: GpsTimestamp::from_secs(1_234_567.5),
            position: Position {
                lat: 47.25,
                lon: -122.5,
                height: 12.0,
            },
            samples,
        };
        let mut out = Vec::new();
        record.write_to(&mut out).unwrap();
        assert_eq!(out.len(), record.encoded_len());
        assert_eq!(out, record.to_vec());
        out
    }

    #[test]
    fn test_layout() {
        let out = record_bytes(&[1, -2]);
        assert_eq!(&out[..4], &[0x7e, 0x6f, 0x50, 0x11]);
        assert_eq!(&out[4..12], &1_234_567.5_f64.to_le_bytes());
        assert_eq!(&out[12..16], &47.25_f32.to_le_bytes());
        assert_eq!(&out[24..], &[0x01, 0x00, 0xfe, 0xff]);
    }

    #[test]
    fn test_decode_written_record() {
        let samples: Vec<i16> = (0..300).map(|i| (i * 97 - 15_000) as i16).collect();
        let out = record_bytes(&samples);
        let mut reader = RecordReader::new(samples.len());
        let (view, consumed) = reader.next_record(&out);
        let view = view.unwrap();
        assert_eq!(consumed, out.len());
        assert_eq!(view.timestamp.as_secs(), 1_234_567.5);
        assert_eq!(view.position.lon, -122.5);
        assert_eq!(view.sample_count(), 300);
        assert!(view.samples().eq(samples.iter().copied()));
    }

    #[test]
    fn test_resync_on_delimiter() {
        let mut stream = vec![0x11, 0x7e, 0x6f, 0x00, 0x42];
        stream.extend(record_bytes(&[5; 4]));
        let mut reader = RecordReader::new(4);
        let (view, consumed) = reader.next_record(&stream);
        assert!(view.is_some());
        assert_eq!(consumed, stream.len());
        assert_eq!(reader.skipped(), 5);
    }

    #[test]
    fn test_incomplete_record_is_kept() {
        let bytes = record_bytes(&[5; 4]);
        let mut reader = RecordReader::new(4);
        let (view, consumed) = reader.next_record(&bytes[..bytes.len() - 1]);
        assert!(view.is_none());
        assert_eq!(consumed, 0);

        // a partial delimiter at the tail stays in the buffer
        let (view, consumed) = reader.next_record(&[0x00, 0x01, 0x7e, 0x6f, 0x50]);
        assert!(view.is_none());
        assert_eq!(consumed, 2);
    }
}
