//! Display and analysis ring buffers advanced in fixed steps

use crate::config::WindowSizes;
use sleepwave_core::{config_error, ChannelSamples, SampleWindow, WaveResult};
use std::collections::VecDeque;
use std::io::Read;

/// Anything that can hand out physical samples in order
pub trait SampleSource {
    /// Append up to `max` samples to `out` and return how many were added.
    ///
    /// Returning fewer than `max` means the source is exhausted.
    fn pull(&mut self, out: &mut Vec<f64>, max: usize) -> WaveResult<usize>;
}

impl<R: Read> SampleSource for ChannelSamples<R> {
    fn pull(&mut self, out: &mut Vec<f64>, max: usize) -> WaveResult<usize> {
        self.read_into(out, max)
    }
}

impl SampleSource for VecDeque<f64> {
    fn pull(&mut self, out: &mut Vec<f64>, max: usize) -> WaveResult<usize> {
        let take = max.min(self.len());
        out.extend(self.drain(..take));
        Ok(take)
    }
}

/// Fixed-capacity circular buffer; unwritten slots read as zero
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f64>,
    written: u64,
}

impl RingBuffer {
    /// Create a zero-filled buffer
    pub fn new(capacity: usize) -> WaveResult<Self> {
        if capacity == 0 {
            return Err(config_error!("ring buffer capacity must be at least one sample"));
        }
        Ok(RingBuffer {
            data: vec![0.0; capacity],
            written: 0,
        })
    }

    /// Overwrite the oldest slot
    #[inline]
    pub fn push(&mut self, value: f64) {
        let slot = (self.written % self.data.len() as u64) as usize;
        self.data[slot] = value;
        self.written += 1;
    }

    /// Push every value in order
    pub fn extend_from_slice(&mut self, values: &[f64]) {
        for &value in values {
            self.push(value);
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Total values ever pushed
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Whether every slot has held real data at least once
    pub fn is_filled(&self) -> bool {
        self.written >= self.data.len() as u64
    }

    /// Contents oldest-first, rotated once at the write cursor
    pub fn snapshot(&self) -> Vec<f64> {
        let split = (self.written % self.data.len() as u64) as usize;
        let mut ordered = Vec::with_capacity(self.data.len());
        ordered.extend_from_slice(&self.data[split..]);
        ordered.extend_from_slice(&self.data[..split]);
        ordered
    }
}

/// Result of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A full step of new samples entered both buffers
    Stepped,
    /// The source ran dry; `pulled` samples of a partial step were absorbed
    EndOfStream { pulled: usize },
}

/// Keeps the display and analysis buffers in lock-step
#[derive(Debug, Clone)]
pub struct WindowingEngine {
    display: RingBuffer,
    analysis: RingBuffer,
    step_size: usize,
    sample_rate_hz: f64,
    samples_read: u64,
    step_buf: Vec<f64>,
}

impl WindowingEngine {
    /// Create engine for a channel sampled at `sample_rate_hz`
    pub fn new(sizes: WindowSizes, sample_rate_hz: f64) -> WaveResult<Self> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(config_error!("sample rate must be positive, got {}", sample_rate_hz));
        }
        if sizes.step_size == 0 {
            return Err(config_error!("step size must be at least one sample"));
        }

        Ok(WindowingEngine {
            display: RingBuffer::new(sizes.display_len)?,
            analysis: RingBuffer::new(sizes.analysis_len)?,
            step_size: sizes.step_size,
            sample_rate_hz,
            samples_read: 0,
            step_buf: Vec::with_capacity(sizes.step_size),
        })
    }

    /// Pull one step from `source` into both buffers
    pub fn advance<S: SampleSource + ?Sized>(&mut self, source: &mut S) -> WaveResult<Advance> {
        self.step_buf.clear();
        let pulled = source.pull(&mut self.step_buf, self.step_size)?;

        self.display.extend_from_slice(&self.step_buf);
        self.analysis.extend_from_slice(&self.step_buf);
        self.samples_read += pulled as u64;

        if pulled < self.step_size {
            Ok(Advance::EndOfStream { pulled })
        } else {
            Ok(Advance::Stepped)
        }
    }

    /// Oldest-first copy of the display buffer
    pub fn display_window(&self) -> SampleWindow {
        self.window_of(&self.display)
    }

    /// Oldest-first copy of the analysis buffer
    pub fn analysis_window(&self) -> SampleWindow {
        self.window_of(&self.analysis)
    }

    fn window_of(&self, buffer: &RingBuffer) -> SampleWindow {
        let start = (self.samples_read as f64 - buffer.capacity() as f64) / self.sample_rate_hz;
        SampleWindow::new(buffer.snapshot(), self.sample_rate_hz, start)
    }

    /// Whether the analysis buffer holds only real samples
    pub fn analysis_ready(&self) -> bool {
        self.analysis.is_filled()
    }

    /// Samples still needed before the analysis buffer is full
    pub fn warmup_remaining(&self) -> usize {
        (self.analysis.capacity() as u64).saturating_sub(self.analysis.written()) as usize
    }

    /// Total samples taken from the source
    pub fn samples_read(&self) -> u64 {
        self.samples_read
    }

    /// Recording time covered so far
    pub fn elapsed_seconds(&self) -> f64 {
        self.samples_read as f64 / self.sample_rate_hz
    }

    pub fn step_size(&self) -> usize {
        self.step_size
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
}
