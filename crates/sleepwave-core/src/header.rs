//! Recording header decoding and encoding
//!
//! A recording starts with a 256-byte ASCII preamble followed by one 256-byte
//! metadata slice per channel. The metadata is stored block-wise: all labels
//! first, then all transducer fields, and so on. Descriptors are rebuilt by
//! position across the blocks, so the i-th entry of every block belongs to
//! the i-th channel.

use crate::error::{WaveError, WaveResult};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::ops::Range;

/// Size of the fixed preamble in bytes
pub const PREAMBLE_LEN: usize = 256;

/// Metadata bytes per channel (sum of all per-channel field widths)
pub const SIGNAL_HEADER_LEN: usize = 256;

/// Width of one raw sample in the data section
pub const BYTES_PER_SAMPLE: usize = 2;

/// Record count value meaning "unknown / unbounded"
pub const UNBOUNDED_RECORDS: i64 = -1;

// Preamble layout
const VERSION: Range<usize> = 0..8;
const PATIENT_ID: Range<usize> = 8..88;
const RECORDING_ID: Range<usize> = 88..168;
const START_DATE: Range<usize> = 168..176;
const START_TIME: Range<usize> = 176..184;
const HEADER_BYTES: Range<usize> = 184..192;
const RESERVED: Range<usize> = 192..236;
const RECORD_COUNT: Range<usize> = 236..244;
const RECORD_DURATION: Range<usize> = 244..252;
const SIGNAL_COUNT: Range<usize> = 252..256;

// Per-channel block widths, in storage order
const LABEL_WIDTH: usize = 16;
const TRANSDUCER_WIDTH: usize = 80;
const DIMENSION_WIDTH: usize = 8;
const NUMBER_WIDTH: usize = 8;
const PREFILTER_WIDTH: usize = 80;
const SIGNAL_RESERVED_WIDTH: usize = 32;

const DEFAULT_PHYSICAL_MIN: f64 = 0.0;
const DEFAULT_PHYSICAL_MAX: f64 = 1.0;
const DEFAULT_DIGITAL_MIN: i32 = -32768;
const DEFAULT_DIGITAL_MAX: i32 = 32767;

/// Linear digital-to-physical mapping of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub scale: f64,
    pub offset: f64,
}

impl Scaling {
    /// Convert a stored digital value into physical units
    #[inline]
    pub fn apply(&self, raw: i16) -> f64 {
        self.scale * f64::from(raw) + self.offset
    }
}

/// Metadata of one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDescriptor {
    /// Channel name, not guaranteed unique
    pub label: String,
    /// Samples of this channel inside one record
    pub samples_per_record: usize,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i32,
    pub digital_max: i32,
}

impl SignalDescriptor {
    /// Create a descriptor from its source fields
    pub fn new(
        label: impl Into<String>,
        samples_per_record: usize,
        physical_range: (f64, f64),
        digital_range: (i32, i32),
    ) -> Self {
        SignalDescriptor {
            label: label.into(),
            samples_per_record,
            physical_min: physical_range.0,
            physical_max: physical_range.1,
            digital_min: digital_range.0,
            digital_max: digital_range.1,
        }
    }

    /// Physical units per digital step
    pub fn scale(&self) -> f64 {
        (self.physical_max - self.physical_min)
            / (f64::from(self.digital_max) - f64::from(self.digital_min))
    }

    /// Physical value of digital zero
    pub fn offset(&self) -> f64 {
        self.physical_min - self.scale() * f64::from(self.digital_min)
    }

    /// Validated scaling; requires `digital_max > digital_min`
    pub fn scaling(&self) -> WaveResult<Scaling> {
        if self.digital_max <= self.digital_min {
            return Err(WaveError::InvalidScaling {
                channel: self.label.clone(),
                digital_min: self.digital_min,
                digital_max: self.digital_max,
            });
        }
        Ok(Scaling {
            scale: self.scale(),
            offset: self.offset(),
        })
    }

    /// Sampling rate given the record duration
    pub fn sample_rate_hz(&self, record_duration_seconds: f64) -> f64 {
        self.samples_per_record as f64 / record_duration_seconds
    }
}

/// Immutable description of a recording, built once per file open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingHeader {
    pub version: String,
    pub patient_id: String,
    pub recording_id: String,
    /// Start date as stored (dd.mm.yy)
    pub start_date: String,
    /// Start time as stored (hh.mm.ss)
    pub start_time: String,
    /// Header size declared in the preamble, if present and numeric
    pub declared_header_bytes: Option<usize>,
    /// Reserved preamble text (EDF+ files put "EDF+C"/"EDF+D" here)
    pub reserved: String,
    /// Number of records, negative when unknown
    pub record_count: i64,
    pub record_duration_seconds: f64,
    /// Channels in storage order
    pub signals: Vec<SignalDescriptor>,
}

impl RecordingHeader {
    /// Create a header with blank identification fields
    pub fn new(record_count: i64, record_duration_seconds: f64, signals: Vec<SignalDescriptor>) -> Self {
        RecordingHeader {
            version: "0".to_string(),
            patient_id: String::new(),
            recording_id: String::new(),
            start_date: String::new(),
            start_time: String::new(),
            declared_header_bytes: None,
            reserved: String::new(),
            record_count,
            record_duration_seconds,
            signals,
        }
    }

    /// Decode a header from a byte source positioned at offset 0.
    ///
    /// On success the source is positioned at the first data record.
    pub fn read_from<R: Read>(reader: &mut R) -> WaveResult<Self> {
        let preamble = read_block(reader, PREAMBLE_LEN)?;
        if preamble.len() < PREAMBLE_LEN {
            return Err(WaveError::malformed(format!(
                "header too short: {} of {} preamble bytes",
                preamble.len(),
                PREAMBLE_LEN
            )));
        }

        let record_count: i64 =
            parse_field(&text(&preamble[RECORD_COUNT]), Some(UNBOUNDED_RECORDS), "record count")?;
        let record_duration_seconds: f64 =
            parse_field(&text(&preamble[RECORD_DURATION]), Some(1.0), "record duration")?;
        if !(record_duration_seconds.is_finite() && record_duration_seconds > 0.0) {
            return Err(WaveError::malformed(format!(
                "record duration must be positive, got {}",
                record_duration_seconds
            )));
        }
        let channel_count: usize = parse_field(&text(&preamble[SIGNAL_COUNT]), None, "channel count")?;

        let blocks = read_block(reader, channel_count * SIGNAL_HEADER_LEN)?;
        if blocks.len() < channel_count * SIGNAL_HEADER_LEN {
            return Err(WaveError::malformed(format!(
                "signal metadata truncated: {} of {} bytes for {} channels",
                blocks.len(),
                channel_count * SIGNAL_HEADER_LEN,
                channel_count
            )));
        }

        let mut cursor = BlockCursor::new(&blocks, channel_count);
        let labels = cursor.texts(LABEL_WIDTH);
        cursor.skip(TRANSDUCER_WIDTH);
        cursor.skip(DIMENSION_WIDTH);
        let physical_min = cursor.numbers(Some(DEFAULT_PHYSICAL_MIN), "physical minimum")?;
        let physical_max = cursor.numbers(Some(DEFAULT_PHYSICAL_MAX), "physical maximum")?;
        let digital_min = cursor.numbers(Some(DEFAULT_DIGITAL_MIN), "digital minimum")?;
        let digital_max = cursor.numbers(Some(DEFAULT_DIGITAL_MAX), "digital maximum")?;
        cursor.skip(PREFILTER_WIDTH);
        let samples_per_record = cursor.numbers(Some(0usize), "samples per record")?;
        cursor.skip(SIGNAL_RESERVED_WIDTH);

        let signals = (0..channel_count)
            .map(|i| SignalDescriptor {
                label: labels[i].clone(),
                samples_per_record: samples_per_record[i],
                physical_min: physical_min[i],
                physical_max: physical_max[i],
                digital_min: digital_min[i],
                digital_max: digital_max[i],
            })
            .collect::<Vec<_>>();

        let header = RecordingHeader {
            version: text(&preamble[VERSION]),
            patient_id: text(&preamble[PATIENT_ID]),
            recording_id: text(&preamble[RECORDING_ID]),
            start_date: text(&preamble[START_DATE]),
            start_time: text(&preamble[START_TIME]),
            declared_header_bytes: text(&preamble[HEADER_BYTES]).parse().ok(),
            reserved: text(&preamble[RESERVED]),
            record_count,
            record_duration_seconds,
            signals,
        };

        tracing::debug!(
            channels = header.channel_count(),
            records = header.record_count,
            record_duration = header.record_duration_seconds,
            "decoded recording header"
        );

        Ok(header)
    }

    /// Encode the preamble and metadata blocks.
    ///
    /// Inverse of [`RecordingHeader::read_from`] for every field the decoder
    /// keeps; discarded fields are written blank.
    pub fn encode(&self) -> Vec<u8> {
        let n = self.signals.len();
        let mut out = Vec::with_capacity(self.header_len());

        put(&mut out, &self.version, VERSION.len());
        put(&mut out, &self.patient_id, PATIENT_ID.len());
        put(&mut out, &self.recording_id, RECORDING_ID.len());
        put(&mut out, &self.start_date, START_DATE.len());
        put(&mut out, &self.start_time, START_TIME.len());
        put(&mut out, &self.header_len().to_string(), HEADER_BYTES.len());
        put(&mut out, &self.reserved, RESERVED.len());
        put(&mut out, &self.record_count.to_string(), RECORD_COUNT.len());
        put(&mut out, &format_decimal(self.record_duration_seconds, RECORD_DURATION.len()), RECORD_DURATION.len());
        put(&mut out, &n.to_string(), SIGNAL_COUNT.len());

        for s in &self.signals {
            put(&mut out, &s.label, LABEL_WIDTH);
        }
        out.resize(out.len() + n * (TRANSDUCER_WIDTH + DIMENSION_WIDTH), b' ');
        for s in &self.signals {
            put(&mut out, &format_decimal(s.physical_min, NUMBER_WIDTH), NUMBER_WIDTH);
        }
        for s in &self.signals {
            put(&mut out, &format_decimal(s.physical_max, NUMBER_WIDTH), NUMBER_WIDTH);
        }
        for s in &self.signals {
            put(&mut out, &s.digital_min.to_string(), NUMBER_WIDTH);
        }
        for s in &self.signals {
            put(&mut out, &s.digital_max.to_string(), NUMBER_WIDTH);
        }
        out.resize(out.len() + n * PREFILTER_WIDTH, b' ');
        for s in &self.signals {
            put(&mut out, &s.samples_per_record.to_string(), NUMBER_WIDTH);
        }
        out.resize(out.len() + n * SIGNAL_RESERVED_WIDTH, b' ');

        out
    }

    /// Total header size in bytes
    pub fn header_len(&self) -> usize {
        PREAMBLE_LEN + self.signals.len() * SIGNAL_HEADER_LEN
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.signals.len()
    }

    /// Whether the record count is unknown
    pub fn is_unbounded(&self) -> bool {
        self.record_count < 0
    }

    /// Record count as a limit, `None` when unbounded
    pub fn record_limit(&self) -> Option<u64> {
        u64::try_from(self.record_count).ok()
    }

    /// Nominal duration of the recording, `None` when unbounded
    pub fn duration_seconds(&self) -> Option<f64> {
        self.record_limit()
            .map(|records| records as f64 * self.record_duration_seconds)
    }

    /// Descriptor of one channel
    pub fn signal(&self, channel: usize) -> WaveResult<&SignalDescriptor> {
        self.signals.get(channel).ok_or(WaveError::InvalidChannel {
            requested: channel,
            available: self.signals.len(),
        })
    }

    /// Index of the first channel with the given label
    pub fn channel_index(&self, label: &str) -> WaveResult<usize> {
        self.signals
            .iter()
            .position(|s| s.label == label)
            .ok_or_else(|| WaveError::UnknownChannel {
                label: label.to_string(),
                available: self.labels(),
            })
    }

    /// All channel labels in storage order
    pub fn labels(&self) -> Vec<String> {
        self.signals.iter().map(|s| s.label.clone()).collect()
    }

    /// Sampling rate of one channel in Hz
    pub fn sample_rate_hz(&self, channel: usize) -> WaveResult<f64> {
        Ok(self.signal(channel)?.sample_rate_hz(self.record_duration_seconds))
    }

    /// Sum of samples per record over all channels
    pub fn total_samples_per_record(&self) -> usize {
        self.signals.iter().map(|s| s.samples_per_record).sum()
    }

    /// Size of one interleaved data record
    pub fn bytes_per_record(&self) -> usize {
        BYTES_PER_SAMPLE * self.total_samples_per_record()
    }
}

/// Walks the per-channel blocks in storage order
struct BlockCursor<'a> {
    bytes: &'a [u8],
    channels: usize,
    pos: usize,
}

impl<'a> BlockCursor<'a> {
    fn new(bytes: &'a [u8], channels: usize) -> Self {
        BlockCursor { bytes, channels, pos: 0 }
    }

    fn texts(&mut self, width: usize) -> Vec<String> {
        let block = &self.bytes[self.pos..self.pos + width * self.channels];
        self.pos += width * self.channels;
        block.chunks_exact(width).map(text).collect()
    }

    fn skip(&mut self, width: usize) {
        self.pos += width * self.channels;
    }

    fn numbers<T: std::str::FromStr>(&mut self, default: Option<T>, field: &str) -> WaveResult<Vec<T>>
    where
        T: Copy,
    {
        self.texts(NUMBER_WIDTH)
            .iter()
            .enumerate()
            .map(|(channel, value)| {
                parse_field(value, default, field).map_err(|_| {
                    WaveError::malformed(format!(
                        "unparsable {} '{}' for channel {}",
                        field, value, channel
                    ))
                })
            })
            .collect()
    }
}

/// Read up to `len` bytes; a shorter result means end of data
fn read_block<R: Read>(reader: &mut R, len: usize) -> WaveResult<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// ASCII text of a field with non-ASCII bytes dropped and whitespace trimmed
fn text(bytes: &[u8]) -> String {
    let raw: String = bytes
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();
    raw.trim().to_string()
}

fn parse_field<T: std::str::FromStr>(value: &str, default: Option<T>, field: &str) -> WaveResult<T> {
    if value.is_empty() {
        return default.ok_or_else(|| WaveError::malformed(format!("missing {}", field)));
    }
    value
        .parse()
        .map_err(|_| WaveError::malformed(format!("unparsable {} '{}'", field, value)))
}

/// Append `value` left-aligned and space-padded to exactly `width` bytes
fn put(out: &mut Vec<u8>, value: &str, width: usize) {
    let bytes: Vec<u8> = value.bytes().filter(u8::is_ascii).take(width).collect();
    let pad = width - bytes.len();
    out.extend_from_slice(&bytes);
    out.resize(out.len() + pad, b' ');
}

/// Shortest decimal rendering of `value` that fits in `width` characters
fn format_decimal(value: f64, width: usize) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        let integer = format!("{}", value as i64);
        if integer.len() <= width {
            return integer;
        }
    }
    for precision in (0..width).rev() {
        let mut rendered = format!("{:.*}", precision, value);
        if rendered.contains('.') {
            let trimmed = rendered.trim_end_matches('0').trim_end_matches('.').len();
            rendered.truncate(trimmed);
        }
        if rendered.len() <= width {
            return rendered;
        }
    }
    format!("{:.0}", value)
}
