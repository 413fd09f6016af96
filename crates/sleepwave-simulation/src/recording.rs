//! Synthetic recording generator writing valid headers and data records

use crate::signal_patterns::SignalPattern;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use sleepwave_core::header::UNBOUNDED_RECORDS;
use sleepwave_core::{config_error, RecordingHeader, Scaling, SignalDescriptor, WaveResult};
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

/// Simulated channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub label: String,
    pub samples_per_record: usize,
    pub pattern: SignalPattern,
    /// Physical range written to the header (µV)
    pub physical_range: (f64, f64),
    pub digital_range: (i32, i32),
}

impl ChannelSpec {
    /// Channel with a ±250 µV range over the full 16-bit digital span
    pub fn new(label: impl Into<String>, samples_per_record: usize, pattern: SignalPattern) -> Self {
        ChannelSpec {
            label: label.into(),
            samples_per_record,
            pattern,
            physical_range: (-250.0, 250.0),
            digital_range: (-32768, 32767),
        }
    }

    fn descriptor(&self) -> SignalDescriptor {
        SignalDescriptor::new(
            self.label.clone(),
            self.samples_per_record,
            self.physical_range,
            self.digital_range,
        )
    }
}

/// Shape of the generated recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSpec {
    pub channels: Vec<ChannelSpec>,
    pub record_duration_seconds: f64,
    /// Records actually written
    pub records: usize,
    /// Declare the record count as unknown (-1) instead of `records`
    pub unbounded: bool,
    /// Append this many bytes of an incomplete extra record
    pub truncated_tail_bytes: usize,
    /// Standard deviation of additive Gaussian noise (µV); zero disables noise
    pub noise_std: f64,
    /// Fixed seed for reproducible noise
    pub seed: Option<u64>,
    pub patient_id: String,
    pub recording_id: String,
}

impl Default for RecordingSpec {
    fn default() -> Self {
        Self {
            channels: vec![ChannelSpec::new(
                "EEG Fpz-Cz",
                100,
                SignalPattern::sleep_cycle(30.0),
            )],
            record_duration_seconds: 1.0,
            records: 270,
            unbounded: false,
            truncated_tail_bytes: 0,
            noise_std: 2.0,
            seed: None,
            patient_id: "X X X X".to_string(),
            recording_id: "Startdate X X X X".to_string(),
        }
    }
}

impl RecordingSpec {
    /// Single-channel recording at `sample_rate_hz` lasting `seconds`
    pub fn single_channel(pattern: SignalPattern, sample_rate_hz: usize, seconds: usize) -> Self {
        Self {
            channels: vec![ChannelSpec::new("EEG", sample_rate_hz, pattern)],
            records: seconds,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> WaveResult<()> {
        if self.channels.is_empty() {
            return Err(config_error!("a recording needs at least one channel"));
        }
        if !(self.record_duration_seconds.is_finite() && self.record_duration_seconds > 0.0) {
            return Err(config_error!(
                "record duration must be positive, got {}",
                self.record_duration_seconds
            ));
        }
        if !(self.noise_std.is_finite() && self.noise_std >= 0.0) {
            return Err(config_error!("noise deviation must be non-negative, got {}", self.noise_std));
        }
        for channel in &self.channels {
            channel.descriptor().scaling()?;
            let (dmin, dmax) = channel.digital_range;
            if dmin < i32::from(i16::MIN) || dmax > i32::from(i16::MAX) {
                return Err(config_error!(
                    "digital range of {} exceeds 16 bits ({}..{})",
                    channel.label,
                    dmin,
                    dmax
                ));
            }
            let peak = channel.pattern.peak_amplitude();
            let (pmin, pmax) = channel.physical_range;
            if peak > pmax.min(-pmin) {
                tracing::warn!(
                    label = %channel.label,
                    peak,
                    "pattern exceeds the physical range and will clip"
                );
            }
        }
        Ok(())
    }

    /// Header describing the generated data
    pub fn header(&self) -> RecordingHeader {
        let record_count = if self.unbounded {
            UNBOUNDED_RECORDS
        } else {
            self.records as i64
        };
        let signals = self.channels.iter().map(ChannelSpec::descriptor).collect();
        let mut header = RecordingHeader::new(record_count, self.record_duration_seconds, signals);
        header.patient_id = self.patient_id.clone();
        header.recording_id = self.recording_id.clone();
        header.start_date = "01.01.26".to_string();
        header.start_time = "22.00.00".to_string();
        header
    }
}

/// Renders a `RecordingSpec` into header and interleaved data records
pub struct RecordingGenerator {
    spec: RecordingSpec,
    header: RecordingHeader,
    scalings: Vec<Scaling>,
    rng: StdRng,
    noise: Option<Normal<f64>>,
}

impl RecordingGenerator {
    pub fn new(spec: RecordingSpec) -> WaveResult<Self> {
        spec.validate()?;

        let rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let noise = if spec.noise_std > 0.0 {
            let normal = Normal::new(0.0, spec.noise_std)
                .map_err(|e| config_error!("invalid noise distribution: {}", e))?;
            Some(normal)
        } else {
            None
        };

        let header = spec.header();
        let scalings = header
            .signals
            .iter()
            .map(SignalDescriptor::scaling)
            .collect::<WaveResult<Vec<_>>>()?;

        Ok(RecordingGenerator {
            spec,
            header,
            scalings,
            rng,
            noise,
        })
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }

    /// Physical value of sample `index` of `channel`, before quantisation
    fn physical_sample(&mut self, channel: usize, index: u64) -> f64 {
        let spec = &self.spec.channels[channel];
        let rate = spec.samples_per_record as f64 / self.spec.record_duration_seconds;
        let mut value = spec.pattern.value_at(index as f64 / rate);
        if let Some(noise) = &self.noise {
            value += noise.sample(&mut self.rng);
        }
        value
    }

    /// Convert a physical value to the stored digital value
    fn quantise(&self, channel: usize, value: f64) -> i16 {
        let (dmin, dmax) = self.spec.channels[channel].digital_range;
        let scaling = self.scalings[channel];
        let digital = ((value - scaling.offset) / scaling.scale).round();
        digital.clamp(f64::from(dmin), f64::from(dmax)) as i16
    }

    /// Encode data record `record`
    pub fn record_bytes(&mut self, record: u64) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.header.bytes_per_record());
        for channel in 0..self.spec.channels.len() {
            let per_record = self.spec.channels[channel].samples_per_record as u64;
            for i in 0..per_record {
                let value = self.physical_sample(channel, record * per_record + i);
                let digital = self.quantise(channel, value);
                bytes.extend_from_slice(&digital.to_le_bytes());
            }
        }
        bytes
    }

    /// Write the whole recording, returning the byte count
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> WaveResult<usize> {
        let header_bytes = self.header.encode();
        writer.write_all(&header_bytes)?;
        let mut written = header_bytes.len();

        for record in 0..self.spec.records as u64 {
            let bytes = self.record_bytes(record);
            writer.write_all(&bytes)?;
            written += bytes.len();
        }

        if self.spec.truncated_tail_bytes > 0 {
            let mut tail = self.record_bytes(self.spec.records as u64);
            tail.truncate(self.spec.truncated_tail_bytes);
            writer.write_all(&tail)?;
            written += tail.len();
        }

        writer.flush()?;
        tracing::debug!(
            records = self.spec.records,
            channels = self.spec.channels.len(),
            bytes = written,
            "synthetic recording written"
        );
        Ok(written)
    }

    /// Whole recording in memory
    pub fn to_bytes(&mut self) -> WaveResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write the recording to `path`, replacing any existing file
    pub fn write_file(&mut self, path: impl AsRef<Path>) -> WaveResult<usize> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        let written = self.write_to(&mut writer)?;
        tracing::info!(path = %path.as_ref().display(), bytes = written, "recording saved");
        Ok(written)
    }
}

/// Generate `spec` straight into memory
pub fn generate_bytes(spec: RecordingSpec) -> WaveResult<Vec<u8>> {
    RecordingGenerator::new(spec)?.to_bytes()
}
