//! JSON output helpers; stdout carries data only

use anyhow::{Context, Result};
use serde::Serialize;
use sleepwave_core::RecordingHeader;
use sleepwave_processing::{Hypnogram, HypnogramSummary, StageLabel};
use std::io::Write;
use std::path::Path;

/// Serialize pretty or compact
pub fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.context("JSON serialization failed")
}

/// Write one line and flush so consumers see it immediately
pub fn write_line<W: Write>(out: &mut W, line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Header plus values derived from it
#[derive(Serialize)]
pub struct RecordingInfo<'a> {
    #[serde(flatten)]
    pub header: &'a RecordingHeader,
    pub header_len: usize,
    pub channel_count: usize,
    pub sample_rates_hz: Vec<f64>,
    /// Declared length; absent for unbounded recordings
    pub duration_seconds: Option<f64>,
}

impl<'a> RecordingInfo<'a> {
    pub fn new(header: &'a RecordingHeader) -> Self {
        RecordingInfo {
            header,
            header_len: header.header_len(),
            channel_count: header.channel_count(),
            sample_rates_hz: header
                .signals
                .iter()
                .map(|s| s.sample_rate_hz(header.record_duration_seconds))
                .collect(),
            duration_seconds: header.duration_seconds(),
        }
    }
}

/// Stage sequence written after a stream
#[derive(Serialize)]
pub struct HypnogramReport {
    pub epoch_seconds: f64,
    pub stages: Vec<StageLabel>,
    pub smoothing_window: usize,
    pub smoothed: Vec<StageLabel>,
    pub summary: HypnogramSummary,
}

impl HypnogramReport {
    pub fn new(hypnogram: &Hypnogram, smoothing_window: usize) -> Result<Self> {
        Ok(HypnogramReport {
            epoch_seconds: hypnogram.epoch_seconds(),
            stages: hypnogram.stages().to_vec(),
            smoothing_window,
            smoothed: hypnogram.smoothed(smoothing_window)?,
            summary: hypnogram.summary(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = to_json(self, false)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write hypnogram to '{}'", path.display()))
    }
}
