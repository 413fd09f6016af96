//! Tapered power spectrum and sleep band aggregation

use realfft::{RealFftPlanner, RealToComplex};
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use sleepwave_core::{config_error, SampleWindow, WaveResult};
use std::sync::Arc;

/// Half-open frequency interval `[low_hz, high_hz)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        FrequencyBand { low_hz, high_hz }
    }

    #[inline]
    pub fn contains(&self, frequency_hz: f64) -> bool {
        frequency_hz >= self.low_hz && frequency_hz < self.high_hz
    }
}

/// Edges of the four sleep EEG bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepBands {
    pub delta: FrequencyBand,
    pub theta: FrequencyBand,
    pub alpha: FrequencyBand,
    pub beta: FrequencyBand,
}

impl Default for SleepBands {
    fn default() -> Self {
        Self {
            delta: FrequencyBand::new(0.5, 4.0),
            theta: FrequencyBand::new(4.0, 8.0),
            alpha: FrequencyBand::new(8.0, 13.0),
            beta: FrequencyBand::new(13.0, 30.0),
        }
    }
}

impl SleepBands {
    /// Bands in ascending order with their names
    pub fn named(&self) -> [(&'static str, FrequencyBand); 4] {
        [
            ("delta", self.delta),
            ("theta", self.theta),
            ("alpha", self.alpha),
            ("beta", self.beta),
        ]
    }

    /// Each band must be non-empty and may only touch its neighbours at the edges
    pub fn validate(&self) -> WaveResult<()> {
        let named = self.named();
        for (name, band) in &named {
            if !(band.low_hz >= 0.0 && band.high_hz > band.low_hz) {
                return Err(config_error!(
                    "{} band [{}, {}) is empty or negative",
                    name,
                    band.low_hz,
                    band.high_hz
                ));
            }
        }
        for pair in named.windows(2) {
            if pair[1].1.low_hz < pair[0].1.high_hz {
                return Err(config_error!("{} and {} bands overlap", pair[0].0, pair[1].0));
            }
        }
        Ok(())
    }
}

/// Summed spectral power per sleep band
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl BandPowers {
    /// Sum of the four bands
    pub fn total(&self) -> f64 {
        self.delta + self.theta + self.alpha + self.beta
    }

    /// Each band as a fraction of the total; all zero when the total is zero
    pub fn relative(&self) -> BandPowers {
        let total = self.total();
        let total = if total == 0.0 { 1.0 } else { total };
        BandPowers {
            delta: self.delta / total,
            theta: self.theta / total,
            alpha: self.alpha / total,
            beta: self.beta / total,
        }
    }
}

/// One-sided power spectrum
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerSpectrum {
    /// Bin centre frequencies, ascending from 0 Hz
    pub frequencies_hz: Vec<f64>,
    /// Squared magnitude per bin
    pub power: Vec<f64>,
}

impl PowerSpectrum {
    /// Power summed over the bins inside `band`
    pub fn band_power(&self, band: &FrequencyBand) -> f64 {
        self.frequencies_hz
            .iter()
            .zip(&self.power)
            .filter(|(f, _)| band.contains(**f))
            .map(|(_, p)| p)
            .sum()
    }

    /// Aggregate into the four sleep bands
    pub fn band_powers(&self, bands: &SleepBands) -> BandPowers {
        BandPowers {
            delta: self.band_power(&bands.delta),
            theta: self.band_power(&bands.theta),
            alpha: self.band_power(&bands.alpha),
            beta: self.band_power(&bands.beta),
        }
    }

    /// Copy restricted to bins at or below `max_hz`
    pub fn truncated(&self, max_hz: f64) -> PowerSpectrum {
        let keep = self
            .frequencies_hz
            .iter()
            .take_while(|&&f| f <= max_hz)
            .count();
        PowerSpectrum {
            frequencies_hz: self.frequencies_hz[..keep].to_vec(),
            power: self.power[..keep].to_vec(),
        }
    }

    /// Frequency of the strongest bin, if any
    pub fn peak_frequency(&self) -> Option<f64> {
        self.power
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| self.frequencies_hz[i])
    }

    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }
}

/// Result of analysing one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralEstimate {
    pub spectrum: PowerSpectrum,
    pub band_powers: BandPowers,
}

/// Symmetric Hann taper of length `len`
pub fn hann_window(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (len - 1) as f64;
            (0..len)
                .map(|n| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * n as f64 / denom).cos())
                .collect()
        }
    }
}

/// Spectral analyzer with cached FFT plan and taper
pub struct SpectralAnalyzer {
    bands: SleepBands,
    planner: RealFftPlanner<f64>,
    plan: Option<Arc<dyn RealToComplex<f64>>>,
    taper: Vec<f64>,
    input: Vec<f64>,
    output: Vec<Complex<f64>>,
}

impl SpectralAnalyzer {
    /// Create analyzer aggregating into `bands`
    pub fn new(bands: SleepBands) -> Self {
        SpectralAnalyzer {
            bands,
            planner: RealFftPlanner::new(),
            plan: None,
            taper: Vec::new(),
            input: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Analyzer for the default sleep bands
    pub fn sleep_eeg() -> Self {
        Self::new(SleepBands::default())
    }

    pub fn bands(&self) -> &SleepBands {
        &self.bands
    }

    /// Mean-removed, Hann-tapered power spectrum of `samples`
    pub fn power_spectrum(&mut self, samples: &[f64], sample_rate_hz: f64) -> PowerSpectrum {
        let n = samples.len();
        if n == 0 {
            return PowerSpectrum::default();
        }
        if n == 1 {
            // a single sample equals its own mean
            return PowerSpectrum {
                frequencies_hz: vec![0.0],
                power: vec![0.0],
            };
        }

        self.prepare(n);
        let mean = samples.iter().sum::<f64>() / n as f64;
        for ((slot, &x), &w) in self.input.iter_mut().zip(samples).zip(&self.taper) {
            *slot = (x - mean) * w;
        }

        let plan = match &self.plan {
            Some(plan) => Arc::clone(plan),
            None => return PowerSpectrum::default(),
        };
        if let Err(e) = plan.process(&mut self.input, &mut self.output) {
            tracing::error!(len = n, "FFT failed: {}", e);
            return PowerSpectrum::default();
        }

        let resolution = sample_rate_hz / n as f64;
        PowerSpectrum {
            frequencies_hz: (0..self.output.len()).map(|k| k as f64 * resolution).collect(),
            power: self.output.iter().map(|c| c.norm_sqr()).collect(),
        }
    }

    /// Band powers of `samples`
    pub fn band_powers(&mut self, samples: &[f64], sample_rate_hz: f64) -> BandPowers {
        let bands = self.bands;
        self.power_spectrum(samples, sample_rate_hz).band_powers(&bands)
    }

    /// Spectrum and band powers of a window
    pub fn analyze(&mut self, window: &SampleWindow) -> SpectralEstimate {
        let spectrum = self.power_spectrum(&window.samples, window.sample_rate_hz);
        let band_powers = spectrum.band_powers(&self.bands);
        SpectralEstimate {
            spectrum,
            band_powers,
        }
    }

    /// Re-plan when the window length changes
    fn prepare(&mut self, len: usize) {
        if self.taper.len() == len && self.plan.is_some() {
            return;
        }
        let plan = self.planner.plan_fft_forward(len);
        self.input = plan.make_input_vec();
        self.output = plan.make_output_vec();
        self.taper = hann_window(len);
        self.plan = Some(plan);
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::sleep_eeg()
    }
}
