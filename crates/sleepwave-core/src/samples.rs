//! Channel sample producer
//!
//! De-interleaves one channel out of the record stream and converts every raw
//! sample into physical units. The producer owns its read cursor and drops it
//! as soon as the sequence is exhausted, so the underlying handle never
//! outlives the data it serves.

use crate::error::WaveResult;
use crate::header::{RecordingHeader, Scaling, BYTES_PER_SAMPLE};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Byte layout of one channel inside an interleaved record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    /// Target channel index
    pub channel: usize,
    /// Target channel samples per record
    pub samples_per_record: usize,
    /// Size of one full record
    pub bytes_per_record: usize,
    /// Bytes of the channels stored before the target
    pub bytes_before: usize,
    /// Bytes of the channels stored after the target
    pub bytes_after: usize,
}

impl RecordLayout {
    /// Compute the layout of `channel` within the header's records
    pub fn new(header: &RecordingHeader, channel: usize) -> WaveResult<Self> {
        let signal = header.signal(channel)?;
        let bytes_per_record = header.bytes_per_record();
        let bytes_before = BYTES_PER_SAMPLE
            * header.signals[..channel]
                .iter()
                .map(|s| s.samples_per_record)
                .sum::<usize>();
        let span = BYTES_PER_SAMPLE * signal.samples_per_record;

        Ok(RecordLayout {
            channel,
            samples_per_record: signal.samples_per_record,
            bytes_per_record,
            bytes_before,
            bytes_after: bytes_per_record - bytes_before - span,
        })
    }

    /// Byte range of the target channel within a record
    pub fn span(&self) -> std::ops::Range<usize> {
        self.bytes_before..self.bytes_per_record - self.bytes_after
    }
}

/// Why a producer stopped yielding samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// Declared record count reached
    RecordLimit,
    /// No bytes left at a record boundary
    EndOfData,
    /// Trailing record was cut short; its samples are discarded
    ShortRecord { bytes_read: usize },
    /// A read failed; the error was returned to the caller
    Failed,
    /// The owner released the read handle
    Released,
}

/// Producer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Streaming,
    Exhausted(Exhaustion),
}

/// Lazy, forward-only sequence of physical samples for one channel
pub struct ChannelSamples<R> {
    reader: Option<R>,
    layout: RecordLayout,
    scaling: Scaling,
    record_limit: Option<u64>,
    records_read: u64,
    record_buf: Vec<u8>,
    pending: Vec<f64>,
    pending_pos: usize,
    samples_emitted: u64,
    state: ProducerState,
}

impl<R: Read> ChannelSamples<R> {
    /// Create a producer over a source positioned right after the header
    pub fn new(reader: R, header: &RecordingHeader, channel: usize) -> WaveResult<Self> {
        let layout = RecordLayout::new(header, channel)?;
        let scaling = header.signals[channel].scaling()?;

        let mut producer = ChannelSamples {
            reader: Some(reader),
            layout,
            scaling,
            record_limit: header.record_limit(),
            records_read: 0,
            record_buf: vec![0; layout.bytes_per_record],
            pending: Vec::with_capacity(layout.samples_per_record),
            pending_pos: 0,
            samples_emitted: 0,
            state: ProducerState::Streaming,
        };

        if layout.bytes_per_record == 0 {
            producer.finish(Exhaustion::EndOfData);
        }

        Ok(producer)
    }

    /// Next physical sample, `Ok(None)` once exhausted
    pub fn next_sample(&mut self) -> WaveResult<Option<f64>> {
        while self.pending_pos >= self.pending.len() {
            if !self.load_record()? {
                return Ok(None);
            }
        }
        let value = self.pending[self.pending_pos];
        self.pending_pos += 1;
        self.samples_emitted += 1;
        Ok(Some(value))
    }

    /// Append up to `max` samples to `out`, returning how many were added.
    ///
    /// Fewer than `max` only when the sequence is exhausted.
    pub fn read_into(&mut self, out: &mut Vec<f64>, max: usize) -> WaveResult<usize> {
        let mut added = 0;
        while added < max {
            if self.pending_pos >= self.pending.len() && !self.load_record()? {
                break;
            }
            let take = (self.pending.len() - self.pending_pos).min(max - added);
            out.extend_from_slice(&self.pending[self.pending_pos..self.pending_pos + take]);
            self.pending_pos += take;
            self.samples_emitted += take as u64;
            added += take;
        }
        Ok(added)
    }

    /// Read and decode the next record; `false` when none is left
    fn load_record(&mut self) -> WaveResult<bool> {
        if self.state != ProducerState::Streaming {
            return Ok(false);
        }
        if let Some(limit) = self.record_limit {
            if self.records_read >= limit {
                self.finish(Exhaustion::RecordLimit);
                return Ok(false);
            }
        }

        let filled = match self.fill_record() {
            Ok(filled) => filled,
            Err(e) => {
                tracing::error!(channel = self.layout.channel, records = self.records_read, "record read failed: {}", e);
                self.finish(Exhaustion::Failed);
                return Err(e.into());
            }
        };

        if filled == 0 {
            self.finish(Exhaustion::EndOfData);
            return Ok(false);
        }
        if filled < self.layout.bytes_per_record {
            tracing::debug!(
                bytes_read = filled,
                expected = self.layout.bytes_per_record,
                "trailing record truncated, ending channel stream"
            );
            self.finish(Exhaustion::ShortRecord { bytes_read: filled });
            return Ok(false);
        }

        let scaling = self.scaling;
        self.pending.clear();
        self.pending.extend(
            self.record_buf[self.layout.span()]
                .chunks_exact(BYTES_PER_SAMPLE)
                .map(|pair| scaling.apply(i16::from_le_bytes([pair[0], pair[1]]))),
        );
        self.pending_pos = 0;
        self.records_read += 1;
        Ok(true)
    }

    /// Fill the record buffer, returning the number of bytes obtained
    fn fill_record(&mut self) -> std::io::Result<usize> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(0),
        };
        let mut filled = 0;
        while filled < self.record_buf.len() {
            match reader.read(&mut self.record_buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R> ChannelSamples<R> {
    fn finish(&mut self, reason: Exhaustion) {
        if self.state == ProducerState::Streaming {
            self.state = ProducerState::Exhausted(reason);
        }
        self.reader = None;
        self.pending.clear();
        self.pending_pos = 0;
    }

    /// Stop the sequence and hand back the read handle, if still held
    pub fn release(&mut self) -> Option<R> {
        let reader = self.reader.take();
        self.finish(Exhaustion::Released);
        reader
    }

    /// Current lifecycle state
    pub fn state(&self) -> ProducerState {
        self.state
    }

    /// Whether the sequence has ended
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, ProducerState::Exhausted(_))
    }

    /// Whether the producer still owns its read handle
    pub fn holds_reader(&self) -> bool {
        self.reader.is_some()
    }

    /// Channel layout this producer decodes
    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Complete records consumed so far
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Samples handed out so far
    pub fn samples_emitted(&self) -> u64 {
        self.samples_emitted
    }
}

impl<R: Read> Iterator for ChannelSamples<R> {
    type Item = WaveResult<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sample().transpose()
    }
}

/// Open a recording file, decode its header and position a producer on `channel`
pub fn open_channel(
    path: impl AsRef<Path>,
    channel: usize,
) -> WaveResult<(RecordingHeader, ChannelSamples<BufReader<File>>)> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let header = RecordingHeader::read_from(&mut reader)?;
    let samples = ChannelSamples::new(reader, &header, channel)?;
    Ok((header, samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaveError;
    use crate::header::SignalDescriptor;
    use std::io::Cursor;

    fn recording(header: &RecordingHeader, records: &[Vec<Vec<i16>>]) -> Vec<u8> {
        let mut bytes = header.encode();
        for record in records {
            for channel in record {
                for value in channel {
                    bytes.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
        bytes
    }

    fn single_channel(record_count: i64, samples_per_record: usize) -> RecordingHeader {
        RecordingHeader::new(
            record_count,
            1.0,
            vec![SignalDescriptor::new("EEG", samples_per_record, (-32768.0, 32767.0), (-32768, 32767))],
        )
    }

    fn producer(bytes: Vec<u8>, channel: usize) -> ChannelSamples<Cursor<Vec<u8>>> {
        let mut cursor = Cursor::new(bytes);
        let header = RecordingHeader::read_from(&mut cursor).unwrap();
        ChannelSamples::new(cursor, &header, channel).unwrap()
    }

    #[test]
    fn test_record_count_bounds_sample_count() {
        let header = single_channel(10, 4);
        let records: Vec<_> = (0..10).map(|r| vec![vec![r as i16; 4]]).collect();
        let samples: Vec<f64> = producer(recording(&header, &records), 0)
            .map(Result::unwrap)
            .collect();
        assert_eq!(samples.len(), 40);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[39], 9.0);
    }

    #[test]
    fn test_record_limit_ignores_trailing_bytes() {
        let header = single_channel(2, 3);
        let records: Vec<_> = (0..5).map(|_| vec![vec![1i16; 3]]).collect();
        let mut samples = producer(recording(&header, &records), 0);
        assert_eq!(samples.by_ref().count(), 6);
        assert_eq!(samples.state(), ProducerState::Exhausted(Exhaustion::RecordLimit));
        assert!(!samples.holds_reader());
    }

    #[test]
    fn test_truncated_trailing_record_ends_silently() {
        let header = single_channel(4, 4);
        let records: Vec<_> = (0..4).map(|_| vec![vec![7i16; 4]]).collect();
        let mut bytes = recording(&header, &records);
        bytes.truncate(bytes.len() - 4); // last record keeps half of its 8 bytes

        let mut samples = producer(bytes, 0);
        let values: Vec<f64> = samples.by_ref().map(Result::unwrap).collect();
        assert_eq!(values.len(), 12);
        assert_eq!(
            samples.state(),
            ProducerState::Exhausted(Exhaustion::ShortRecord { bytes_read: 4 })
        );
    }

    #[test]
    fn test_unbounded_runs_to_end_of_data() {
        let header = single_channel(-1, 2);
        let records: Vec<_> = (0..3).map(|_| vec![vec![0i16; 2]]).collect();
        let mut samples = producer(recording(&header, &records), 0);
        assert_eq!(samples.by_ref().count(), 6);
        assert_eq!(samples.state(), ProducerState::Exhausted(Exhaustion::EndOfData));
    }

    #[test]
    fn test_deinterleaves_target_channel() {
        let header = RecordingHeader::new(
            2,
            1.0,
            vec![
                SignalDescriptor::new("A", 2, (-32768.0, 32767.0), (-32768, 32767)),
                SignalDescriptor::new("B", 3, (-32768.0, 32767.0), (-32768, 32767)),
                SignalDescriptor::new("C", 1, (-32768.0, 32767.0), (-32768, 32767)),
            ],
        );
        let records = vec![
            vec![vec![1, 2], vec![10, 11, 12], vec![100]],
            vec![vec![3, 4], vec![13, 14, 15], vec![101]],
        ];
        let bytes = recording(&header, &records);

        let b: Vec<f64> = producer(bytes.clone(), 1).map(Result::unwrap).collect();
        assert_eq!(b, vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let c: Vec<f64> = producer(bytes, 2).map(Result::unwrap).collect();
        assert_eq!(c, vec![100.0, 101.0]);

        let layout = RecordLayout::new(&header, 1).unwrap();
        assert_eq!(layout.bytes_per_record, 12);
        assert_eq!(layout.bytes_before, 4);
        assert_eq!(layout.bytes_after, 2);
    }

    #[test]
    fn test_applies_physical_scaling() {
        let header = RecordingHeader::new(
            1,
            1.0,
            vec![SignalDescriptor::new("EEG", 3, (-100.0, 100.0), (-32768, 32767))],
        );
        let bytes = recording(&header, &[vec![vec![0, 32767, -32768]]]);
        let values: Vec<f64> = producer(bytes, 0).map(Result::unwrap).collect();
        assert!(values[0].abs() < 0.01);
        assert!((values[1] - 100.0).abs() < 1e-9);
        assert!((values[2] + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_channel_rejected() {
        let header = single_channel(1, 1);
        let result = ChannelSamples::new(Cursor::new(Vec::new()), &header, 1);
        assert!(matches!(result, Err(WaveError::InvalidChannel { requested: 1, available: 1 })));
    }

    #[test]
    fn test_read_into_batches() {
        let header = single_channel(3, 4);
        let records: Vec<_> = (0..3).map(|r| vec![vec![r as i16; 4]]).collect();
        let mut samples = producer(recording(&header, &records), 0);

        let mut out = Vec::new();
        assert_eq!(samples.read_into(&mut out, 5).unwrap(), 5);
        assert_eq!(samples.read_into(&mut out, 5).unwrap(), 5);
        assert_eq!(samples.read_into(&mut out, 5).unwrap(), 2);
        assert_eq!(out.len(), 12);
        assert_eq!(samples.samples_emitted(), 12);
        assert!(samples.is_exhausted());
    }

    struct FailingReader {
        remaining: Vec<u8>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.remaining.is_empty() {
                return Err(std::io::Error::new(ErrorKind::Other, "device gone"));
            }
            let n = buf.len().min(self.remaining.len());
            buf[..n].copy_from_slice(&self.remaining[..n]);
            self.remaining.drain(..n);
            Ok(n)
        }
    }

    #[test]
    fn test_io_failure_surfaces_once() {
        let header = single_channel(-1, 2);
        let data: Vec<u8> = [5i16, 6].iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut samples = ChannelSamples::new(FailingReader { remaining: data }, &header, 0).unwrap();

        assert_eq!(samples.next_sample().unwrap(), Some(5.0));
        assert_eq!(samples.next_sample().unwrap(), Some(6.0));
        assert!(matches!(samples.next_sample(), Err(WaveError::Io(_))));
        assert_eq!(samples.state(), ProducerState::Exhausted(Exhaustion::Failed));
        assert_eq!(samples.next_sample().unwrap(), None);
    }

    #[test]
    fn test_failed_batch_still_counts_appended_samples() {
        let header = single_channel(-1, 2);
        let data: Vec<u8> = [1i16, 2, 3, 4].iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut samples = ChannelSamples::new(FailingReader { remaining: data }, &header, 0).unwrap();

        let mut out = Vec::new();
        assert!(matches!(samples.read_into(&mut out, 10), Err(WaveError::Io(_))));
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(samples.samples_emitted(), 4);
    }

    #[test]
    fn test_release_drops_reader() {
        let header = single_channel(-1, 2);
        let mut samples = ChannelSamples::new(Cursor::new(vec![0u8; 40]), &header, 0).unwrap();
        samples.next_sample().unwrap();
        assert!(samples.release().is_some());
        assert!(!samples.holds_reader());
        assert_eq!(samples.next_sample().unwrap(), None);
        assert_eq!(samples.state(), ProducerState::Exhausted(Exhaustion::Released));
    }
}
