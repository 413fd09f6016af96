//! Events emitted by a stream session, one per tick

use serde::{Deserialize, Serialize};
use sleepwave_core::{ErrorKind, SampleWindow, WaveError};
use sleepwave_processing::{BandPowers, HypnogramSummary, PowerSpectrum, StageLabel};

/// One analysis snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 1-based tick number
    pub tick: u64,
    /// Recording time covered so far
    pub elapsed_seconds: f64,
    /// Total samples consumed from the channel
    pub samples_read: u64,
    /// Display buffer, oldest first
    pub window: SampleWindow,
    /// False while the analysis buffer still holds zero padding
    pub analysis_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub band_powers: Option<BandPowers>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub relative_powers: Option<BandPowers>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stage: Option<StageLabel>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub spectrum: Option<PowerSpectrum>,
}

/// Why a stream ended normally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The channel ran out of complete records
    EndOfRecording,
    /// Wall-clock ceiling reached
    MaxDuration,
    /// Tick ceiling reached
    MaxTicks,
}

/// Terminal payload of a completed stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub reason: EndReason,
    pub elapsed_seconds: f64,
    pub samples_read: u64,
    /// Data events emitted
    pub ticks: u64,
    /// Wall-clock time from the first tick
    pub wall_seconds: f64,
    /// Stages of every analysed tick
    pub hypnogram: HypnogramSummary,
}

/// Terminal payload of a failed stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub elapsed_seconds: f64,
    pub samples_read: u64,
    pub ticks: u64,
}

impl StreamFailure {
    pub fn new(error: &WaveError, elapsed_seconds: f64, samples_read: u64, ticks: u64) -> Self {
        StreamFailure {
            kind: error.kind(),
            message: error.to_string(),
            elapsed_seconds,
            samples_read,
            ticks,
        }
    }
}

/// Exactly one of data, done or error per event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    Data(Snapshot),
    Done(StreamSummary),
    Error(StreamFailure),
}

impl StreamEvent {
    /// Whether no further events follow
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Data(_))
    }

    pub fn as_snapshot(&self) -> Option<&Snapshot> {
        match self {
            StreamEvent::Data(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn samples_read(&self) -> u64 {
        match self {
            StreamEvent::Data(s) => s.samples_read,
            StreamEvent::Done(s) => s.samples_read,
            StreamEvent::Error(f) => f.samples_read,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        match self {
            StreamEvent::Data(s) => s.elapsed_seconds,
            StreamEvent::Done(s) => s.elapsed_seconds,
            StreamEvent::Error(f) => f.elapsed_seconds,
        }
    }

    /// Single-line JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
