//! Sleepwave-Processing: windowing, spectral analysis and sleep staging
//!
//! Turns a stream of physical samples into fixed-step display and analysis
//! windows, estimates band power with a tapered FFT and assigns a heuristic
//! sleep stage to each full analysis window.

pub mod analyzer;
pub mod config;
pub mod hypnogram;
pub mod spectral;
pub mod staging;
pub mod windowing;

pub use analyzer::{EpochAnalyzer, WindowAnalysis};
pub use config::{AnalysisConfig, WindowConfig, WindowSizes};
pub use hypnogram::{Hypnogram, HypnogramSummary, StageDurations};
pub use spectral::{
    hann_window, BandPowers, FrequencyBand, PowerSpectrum, SleepBands, SpectralAnalyzer,
    SpectralEstimate,
};
pub use staging::{classify_stage, StageClassifier, StageLabel, StageThresholds};
pub use windowing::{Advance, RingBuffer, SampleSource, WindowingEngine};
