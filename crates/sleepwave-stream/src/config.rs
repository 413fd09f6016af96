//! Stream session configuration

use serde::{Deserialize, Serialize};
use sleepwave_core::{config_error, RecordingHeader, WaveResult};
use sleepwave_processing::{AnalysisConfig, StageThresholds, WindowConfig};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How much a session reports about itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    /// Session lifecycle
    #[default]
    Normal,
    /// Per-tick diagnostics
    Verbose,
    /// Everything, including per-window analysis
    Trace,
}

impl Verbosity {
    /// Map `-q` / repeated `-v` flags onto a level
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, 0) => Verbosity::Normal,
            (false, 1) => Verbosity::Verbose,
            (false, _) => Verbosity::Trace,
        }
    }

    /// Default directive for a tracing filter
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::Trace => "trace",
        }
    }

    pub fn per_tick(self) -> bool {
        self >= Verbosity::Verbose
    }
}

/// Which channel a session streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelSelector {
    /// Storage position
    Index(usize),
    /// First channel whose label matches exactly
    Label(String),
}

impl Default for ChannelSelector {
    fn default() -> Self {
        ChannelSelector::Index(0)
    }
}

impl ChannelSelector {
    /// Channel index inside `header`
    pub fn resolve(&self, header: &RecordingHeader) -> WaveResult<usize> {
        match self {
            ChannelSelector::Index(index) => {
                header.signal(*index)?;
                Ok(*index)
            }
            ChannelSelector::Label(label) => header.channel_index(label),
        }
    }
}

impl FromStr for ChannelSelector {
    type Err = std::convert::Infallible;

    /// Digits select by index; anything else by label
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<usize>() {
            Ok(index) => ChannelSelector::Index(index),
            Err(_) => ChannelSelector::Label(s.to_string()),
        })
    }
}

impl fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSelector::Index(index) => write!(f, "#{}", index),
            ChannelSelector::Label(label) => write!(f, "{:?}", label),
        }
    }
}

/// Configuration for one stream session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub channel: ChannelSelector,
    /// Wall-clock time between emitted snapshots
    pub tick_interval_ms: u64,
    pub window: WindowConfig,
    pub analysis: AnalysisConfig,
    pub thresholds: StageThresholds,
    /// Wall-clock ceiling measured from the first tick
    pub max_duration_ms: Option<u64>,
    /// Ceiling on emitted data events
    pub max_ticks: Option<u64>,
    /// Attach the band-limited power spectrum to data events
    pub include_spectrum: bool,
    /// Capacity of the event channel of a spawned stream
    pub event_buffer: usize,
    pub verbosity: Verbosity,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel: ChannelSelector::default(),
            tick_interval_ms: 5000,
            window: WindowConfig::default(),
            analysis: AnalysisConfig::sleep_eeg(),
            thresholds: StageThresholds::default(),
            max_duration_ms: None,
            max_ticks: None,
            include_spectrum: false,
            event_buffer: 16,
            verbosity: Verbosity::Normal,
        }
    }
}

impl StreamConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_ms.map(Duration::from_millis)
    }

    /// Checks that do not depend on the recording
    pub fn validate(&self) -> WaveResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(config_error!("tick interval must be positive"));
        }
        if self.event_buffer == 0 {
            return Err(config_error!("event buffer must hold at least one event"));
        }
        for (name, seconds) in [
            ("display window", self.window.display_seconds),
            ("analysis window", self.window.analysis_seconds),
            ("step", self.window.step_seconds),
        ] {
            if !(seconds.is_finite() && seconds > 0.0) {
                return Err(config_error!("{} must be positive, got {}", name, seconds));
            }
        }
        self.analysis.validate()?;
        self.thresholds.validate()?;
        Ok(())
    }
}
