//! SampleWindow: owned snapshot of a buffered channel segment

use serde::{Deserialize, Serialize};

/// Chronological (oldest-first) run of physical samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleWindow {
    /// Physical samples, oldest first
    pub samples: Vec<f64>,
    /// Sampling rate in Hz
    pub sample_rate_hz: f64,
    /// Recording time of the first sample; negative while the window
    /// still holds leading zero padding
    pub window_start_seconds: f64,
}

impl SampleWindow {
    /// Create a new window
    pub fn new(samples: Vec<f64>, sample_rate_hz: f64, window_start_seconds: f64) -> Self {
        SampleWindow {
            samples,
            sample_rate_hz,
            window_start_seconds,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if window is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Window span in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate_hz > 0.0 {
            self.samples.len() as f64 / self.sample_rate_hz
        } else {
            0.0
        }
    }

    /// Basic statistics of the samples
    pub fn stats(&self) -> WindowStats {
        WindowStats::calculate(&self.samples)
    }
}

/// Basic statistics for a sample window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub mean: f64,
    pub rms: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl WindowStats {
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let rms = (data.iter().map(|x| x * x).sum::<f64>() / n).sqrt();
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            rms,
            std_dev: variance.sqrt(),
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}
