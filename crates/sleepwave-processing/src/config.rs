//! Configuration for windowing and spectral analysis

use crate::spectral::SleepBands;
use serde::{Deserialize, Serialize};
use sleepwave_core::{config_error, WaveResult};

/// Window spans expressed in seconds of recording time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Visual window shown to the consumer
    pub display_seconds: f64,
    /// Window fed to the spectral estimate
    pub analysis_seconds: f64,
    /// New data per update tick
    pub step_seconds: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            display_seconds: 30.0,
            analysis_seconds: 30.0,
            step_seconds: 5.0,
        }
    }
}

impl WindowConfig {
    /// Short display with fast updates for live monitoring
    pub fn live_preview() -> Self {
        Self {
            display_seconds: 10.0,
            analysis_seconds: 30.0,
            step_seconds: 1.0,
        }
    }

    /// Scoring-epoch layout: 30 s windows advanced one epoch at a time
    pub fn epoch_scoring() -> Self {
        Self {
            display_seconds: 30.0,
            analysis_seconds: 30.0,
            step_seconds: 30.0,
        }
    }

    /// Spans given in samples at `sample_rate_hz`
    pub fn from_samples(
        display_len: usize,
        analysis_len: usize,
        step_size: usize,
        sample_rate_hz: f64,
    ) -> WaveResult<Self> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(config_error!("sample rate must be positive, got {}", sample_rate_hz));
        }
        let sizes = WindowSizes::new(display_len, analysis_len, step_size)?;
        Ok(Self {
            display_seconds: sizes.display_len as f64 / sample_rate_hz,
            analysis_seconds: sizes.analysis_len as f64 / sample_rate_hz,
            step_seconds: sizes.step_size as f64 / sample_rate_hz,
        })
    }

    /// Convert to sample counts at `sample_rate_hz`, rounding to the nearest sample
    pub fn to_sizes(&self, sample_rate_hz: f64) -> WaveResult<WindowSizes> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(config_error!("sample rate must be positive, got {}", sample_rate_hz));
        }
        let samples = |seconds: f64, what: &str| -> WaveResult<usize> {
            if !(seconds.is_finite() && seconds > 0.0) {
                return Err(config_error!("{} must be positive, got {}", what, seconds));
            }
            Ok((seconds * sample_rate_hz).round() as usize)
        };
        WindowSizes::new(
            samples(self.display_seconds, "display window")?,
            samples(self.analysis_seconds, "analysis window")?,
            samples(self.step_seconds, "step")?,
        )
    }
}

/// Window spans in samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSizes {
    pub display_len: usize,
    pub analysis_len: usize,
    pub step_size: usize,
}

impl WindowSizes {
    /// Validated sizes; every span must hold at least one sample
    pub fn new(display_len: usize, analysis_len: usize, step_size: usize) -> WaveResult<Self> {
        if display_len == 0 || analysis_len == 0 || step_size == 0 {
            return Err(config_error!(
                "window sizes must be at least one sample (display {}, analysis {}, step {})",
                display_len,
                analysis_len,
                step_size
            ));
        }
        Ok(Self {
            display_len,
            analysis_len,
            step_size,
        })
    }
}

/// Spectral analysis and staging parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Band edges used for band power aggregation
    pub bands: SleepBands,
    /// Upper frequency kept when a spectrum is attached to a snapshot
    pub spectrum_max_hz: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::sleep_eeg()
    }
}

impl AnalysisConfig {
    /// Classic sleep EEG bands, spectrum plotted up to 35 Hz
    pub fn sleep_eeg() -> Self {
        Self {
            bands: SleepBands::default(),
            spectrum_max_hz: 35.0,
        }
    }

    pub fn validate(&self) -> WaveResult<()> {
        self.bands.validate()?;
        if !(self.spectrum_max_hz.is_finite() && self.spectrum_max_hz > 0.0) {
            return Err(config_error!(
                "spectrum limit must be positive, got {}",
                self.spectrum_max_hz
            ));
        }
        Ok(())
    }
}
