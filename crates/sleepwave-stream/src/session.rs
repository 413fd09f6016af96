//! StreamSession: one paced pass over a single channel
//!
//! A session exclusively owns its read handle, ring buffers and analyzer.
//! Each call to [`StreamSession::next_event`] is one tick: wait out the
//! remainder of the tick budget, pull one step of samples, analyse the
//! refreshed window and hand back exactly one event. After a terminal event
//! (`done` or `error`) the handle is released and every later call returns
//! `None`.

use crate::config::{StreamConfig, Verbosity};
use crate::event::{EndReason, Snapshot, StreamEvent, StreamFailure, StreamSummary};
use sleepwave_core::{ChannelSamples, RecordingHeader, WaveError, WaveResult};
use sleepwave_processing::{Advance, EpochAnalyzer, Hypnogram, WindowingEngine};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::time::{sleep_until, Duration, Instant};

/// Paced producer of stream events for one channel
pub struct StreamSession<R> {
    config: StreamConfig,
    header: RecordingHeader,
    channel: usize,
    producer: ChannelSamples<R>,
    engine: WindowingEngine,
    analyzer: EpochAnalyzer,
    hypnogram: Hypnogram,
    tick_interval: Duration,
    first_tick: Option<Instant>,
    last_tick: Option<Instant>,
    ticks: u64,
    finished: bool,
}

impl StreamSession<BufReader<File>> {
    /// Open `path` and prepare a session for the configured channel
    pub fn open(path: impl AsRef<Path>, config: StreamConfig) -> WaveResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let session = Self::from_reader(BufReader::new(file), config)?;
        tracing::info!(
            path = %path.display(),
            channel = session.channel,
            label = %session.channel_label(),
            "stream session opened"
        );
        Ok(session)
    }
}

impl<R: Read> StreamSession<R> {
    /// Decode the header from `reader` and prepare a session
    pub fn from_reader(mut reader: R, config: StreamConfig) -> WaveResult<Self> {
        let header = RecordingHeader::read_from(&mut reader)?;
        Self::with_header(reader, header, config)
    }

    /// Prepare a session over `reader`, already positioned after `header`
    pub fn with_header(reader: R, header: RecordingHeader, config: StreamConfig) -> WaveResult<Self> {
        config.validate()?;
        let channel = config.channel.resolve(&header)?;
        let sample_rate_hz = header.sample_rate_hz(channel)?;
        let sizes = config.window.to_sizes(sample_rate_hz)?;

        let engine = WindowingEngine::new(sizes, sample_rate_hz)?;
        let analyzer = EpochAnalyzer::new(&config.analysis, config.thresholds)?;
        let hypnogram = Hypnogram::new(sizes.step_size as f64 / sample_rate_hz)?;
        let producer = ChannelSamples::new(reader, &header, channel)?;

        tracing::debug!(
            channel,
            sample_rate_hz,
            display_len = sizes.display_len,
            analysis_len = sizes.analysis_len,
            step_size = sizes.step_size,
            tick_interval_ms = config.tick_interval_ms,
            "stream session configured"
        );

        Ok(StreamSession {
            tick_interval: config.tick_interval(),
            config,
            header,
            channel,
            producer,
            engine,
            analyzer,
            hypnogram,
            first_tick: None,
            last_tick: None,
            ticks: 0,
            finished: false,
        })
    }

    /// Run one tick. `None` once a terminal event has been returned.
    ///
    /// The only await is the pacing delay, before any state changes, so the
    /// returned future can be dropped (e.g. in `select!`) without losing data.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        if let Some(max_ticks) = self.config.max_ticks {
            if self.ticks >= max_ticks {
                return Some(self.complete(EndReason::MaxTicks));
            }
        }

        if let Some(last) = self.last_tick {
            sleep_until(last + self.tick_interval).await;
        }

        let now = Instant::now();
        let first = *self.first_tick.get_or_insert(now);
        self.last_tick = Some(now);

        if let Some(max_duration) = self.config.max_duration() {
            if now.duration_since(first) >= max_duration {
                return Some(self.complete(EndReason::MaxDuration));
            }
        }

        Some(run_blocking(|| self.step()))
    }

    /// Advance the buffers one step and turn the result into an event
    fn step(&mut self) -> StreamEvent {
        match self.engine.advance(&mut self.producer) {
            Ok(Advance::Stepped) => {
                self.ticks += 1;
                StreamEvent::Data(self.snapshot())
            }
            Ok(Advance::EndOfStream { pulled }) => {
                if pulled > 0 {
                    tracing::debug!(pulled, "partial final step absorbed");
                }
                self.complete(EndReason::EndOfRecording)
            }
            Err(e) => self.fail(e),
        }
    }

    fn snapshot(&mut self) -> Snapshot {
        let analysis_ready = self.engine.analysis_ready();
        let analysis = if analysis_ready {
            let window = self.engine.analysis_window();
            let result = self.analyzer.analyze(&window, self.config.include_spectrum);
            self.hypnogram.push(result.stage);
            Some(result)
        } else {
            None
        };

        if self.config.verbosity.per_tick() {
            match &analysis {
                Some(result) => tracing::debug!(
                    tick = self.ticks,
                    samples_read = self.engine.samples_read(),
                    stage = %result.stage,
                    processing_time_us = result.processing_time_us,
                    "tick"
                ),
                None => tracing::debug!(
                    tick = self.ticks,
                    samples_read = self.engine.samples_read(),
                    warmup_remaining = self.engine.warmup_remaining(),
                    "tick (warming up)"
                ),
            }
        }

        let (band_powers, relative_powers, stage, spectrum) = match analysis {
            Some(result) => (
                Some(result.band_powers),
                Some(result.relative_powers),
                Some(result.stage),
                result.spectrum,
            ),
            None => (None, None, None, None),
        };

        Snapshot {
            tick: self.ticks,
            elapsed_seconds: self.engine.elapsed_seconds(),
            samples_read: self.engine.samples_read(),
            window: self.engine.display_window(),
            analysis_ready,
            band_powers,
            relative_powers,
            stage,
            spectrum,
        }
    }

    fn complete(&mut self, reason: EndReason) -> StreamEvent {
        self.close();
        let summary = StreamSummary {
            reason,
            elapsed_seconds: self.engine.elapsed_seconds(),
            samples_read: self.engine.samples_read(),
            ticks: self.ticks,
            wall_seconds: self.wall_seconds(),
            hypnogram: self.hypnogram.summary(),
        };
        if self.config.verbosity > Verbosity::Quiet {
            tracing::info!(
                ?reason,
                ticks = summary.ticks,
                samples_read = summary.samples_read,
                "stream finished"
            );
        }
        StreamEvent::Done(summary)
    }

    fn fail(&mut self, error: WaveError) -> StreamEvent {
        self.close();
        tracing::error!(kind = %error.kind(), ticks = self.ticks, "stream failed: {}", error);
        StreamEvent::Error(StreamFailure::new(
            &error,
            self.engine.elapsed_seconds(),
            self.engine.samples_read(),
            self.ticks,
        ))
    }

    /// Stop without a terminal event and release the read handle
    pub fn cancel(&mut self) {
        if !self.finished {
            tracing::info!(ticks = self.ticks, "stream cancelled");
        }
        self.close();
    }

    fn close(&mut self) {
        self.finished = true;
        drop(self.producer.release());
    }

    fn wall_seconds(&self) -> f64 {
        match (self.first_tick, self.last_tick) {
            (Some(first), Some(last)) => last.duration_since(first).as_secs_f64(),
            _ => 0.0,
        }
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn channel_label(&self) -> &str {
        &self.header.signals[self.channel].label
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.engine.sample_rate_hz()
    }

    /// Data events emitted so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn hypnogram(&self) -> &Hypnogram {
        &self.hypnogram
    }

    /// Whether a terminal event was produced or the session was cancelled
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the read handle has been dropped
    pub fn is_released(&self) -> bool {
        !self.producer.holds_reader()
    }
}

/// Run a step that reads the recording and runs the FFT.
///
/// On a multi-threaded runtime the worker hands its other tasks off first;
/// elsewhere the step runs inline.
fn run_blocking<T>(step: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(step)
        }
        _ => step(),
    }
}
