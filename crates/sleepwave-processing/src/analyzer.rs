//! Per-window analysis: spectrum, band powers and stage in one pass

use crate::config::AnalysisConfig;
use crate::spectral::{BandPowers, PowerSpectrum, SpectralAnalyzer};
use crate::staging::{StageClassifier, StageLabel, StageThresholds};
use serde::{Deserialize, Serialize};
use sleepwave_core::{SampleWindow, WaveResult};
use std::time::Instant;

/// Outcome of analysing one full analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowAnalysis {
    /// Absolute band powers
    pub band_powers: BandPowers,
    /// Band powers as fractions of their sum
    pub relative_powers: BandPowers,
    pub stage: StageLabel,
    /// Spectrum limited to the configured maximum frequency
    pub spectrum: Option<PowerSpectrum>,
    /// Wall time spent on the estimate
    pub processing_time_us: u64,
}

/// Combines the spectral analyzer and stage classifier
pub struct EpochAnalyzer {
    spectral: SpectralAnalyzer,
    classifier: StageClassifier,
    spectrum_max_hz: f64,
}

impl EpochAnalyzer {
    /// Validate configuration and build the analyzer
    pub fn new(config: &AnalysisConfig, thresholds: StageThresholds) -> WaveResult<Self> {
        config.validate()?;
        thresholds.validate()?;
        Ok(EpochAnalyzer {
            spectral: SpectralAnalyzer::new(config.bands),
            classifier: StageClassifier::new(thresholds),
            spectrum_max_hz: config.spectrum_max_hz,
        })
    }

    /// Analyse `window`; the spectrum is kept only when `include_spectrum` is set
    pub fn analyze(&mut self, window: &SampleWindow, include_spectrum: bool) -> WindowAnalysis {
        let start = Instant::now();
        let estimate = self.spectral.analyze(window);
        let stage = self.classifier.classify(&estimate.band_powers);

        tracing::trace!(
            len = window.len(),
            stage = %stage,
            total_power = estimate.band_powers.total(),
            "window analysed"
        );

        WindowAnalysis {
            band_powers: estimate.band_powers,
            relative_powers: estimate.band_powers.relative(),
            stage,
            spectrum: include_spectrum.then(|| estimate.spectrum.truncated(self.spectrum_max_hz)),
            processing_time_us: start.elapsed().as_micros() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq_hz: f64, rate: f64, seconds: f64) -> SampleWindow {
        let len = (rate * seconds) as usize;
        let samples = (0..len)
            .map(|i| 30.0 * (2.0 * PI * freq_hz * i as f64 / rate).sin())
            .collect();
        SampleWindow::new(samples, rate, 0.0)
    }

    #[test]
    fn test_slow_wave_window_is_deep_sleep() {
        let mut analyzer =
            EpochAnalyzer::new(&AnalysisConfig::sleep_eeg(), StageThresholds::default()).unwrap();
        let result = analyzer.analyze(&tone(1.5, 100.0, 30.0), false);
        assert_eq!(result.stage, StageLabel::N3);
        assert!(result.relative_powers.delta > 0.9);
        assert!(result.spectrum.is_none());
    }

    #[test]
    fn test_alpha_window_is_awake_with_spectrum() {
        let mut analyzer =
            EpochAnalyzer::new(&AnalysisConfig::sleep_eeg(), StageThresholds::default()).unwrap();
        let result = analyzer.analyze(&tone(10.0, 128.0, 30.0), true);
        assert_eq!(result.stage, StageLabel::Awake);

        let spectrum = result.spectrum.unwrap();
        assert!(spectrum.frequencies_hz.iter().all(|&f| f <= 35.0));
        assert!((spectrum.peak_frequency().unwrap() - 10.0).abs() < 0.1);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let thresholds = StageThresholds {
            deep_delta: -0.1,
            ..Default::default()
        };
        assert!(EpochAnalyzer::new(&AnalysisConfig::sleep_eeg(), thresholds).is_err());
    }
}
