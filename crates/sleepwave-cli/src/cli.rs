use clap::{Args, Parser, Subcommand, ValueEnum};
use sleepwave_processing::WindowConfig;
use sleepwave_stream::ChannelSelector;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sleepwave",
    version,
    about = "Stream sleep-stage analysis from EDF recordings",
    long_about = "Decode EDF recordings, replay one channel at a fixed cadence and emit one JSON \
                  event per tick with the display window, band powers and a coarse sleep stage."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the recording header as JSON
    Info(InfoArgs),
    /// Stream analysis events for one channel as JSON lines
    Stream(StreamArgs),
    /// Write a synthetic recording
    Generate(GenerateArgs),
}

#[derive(Args)]
pub struct InfoArgs {
    /// Recording to inspect
    pub file: PathBuf,

    /// Single-line JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Args)]
pub struct StreamArgs {
    /// Recording to stream
    pub file: PathBuf,

    /// JSON stream configuration; flags override its fields
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Channel index or exact label
    #[arg(short, long)]
    pub channel: Option<ChannelSelector>,

    /// Milliseconds between events
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Starting window layout; the per-window flags below refine it
    #[arg(long, value_enum)]
    pub window_preset: Option<WindowPreset>,

    /// Display window length in seconds
    #[arg(long)]
    pub display_seconds: Option<f64>,

    /// Analysis window length in seconds
    #[arg(long)]
    pub analysis_seconds: Option<f64>,

    /// New data per tick in seconds
    #[arg(long)]
    pub step_seconds: Option<f64>,

    /// Stop after this many data events
    #[arg(long)]
    pub max_ticks: Option<u64>,

    /// Stop after this much wall-clock time
    #[arg(long)]
    pub max_duration_ms: Option<u64>,

    /// Attach the power spectrum to data events
    #[arg(long)]
    pub spectrum: bool,

    /// Write the stage sequence (raw and median-smoothed) to this file
    #[arg(long)]
    pub hypnogram: Option<PathBuf>,

    /// Median filter width for the smoothed hypnogram (odd)
    #[arg(long, default_value_t = 5)]
    pub smoothing: usize,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Output file
    pub output: PathBuf,

    /// Signal pattern: awake, n1, n2, n3, rem, night or flat
    #[arg(long, default_value = "night")]
    pub pattern: String,

    /// Channel label
    #[arg(long, default_value = "EEG Fpz-Cz")]
    pub label: String,

    /// Number of complete records
    #[arg(long, default_value_t = 270)]
    pub records: usize,

    /// Samples per second
    #[arg(long, default_value_t = 100)]
    pub rate: usize,

    /// Seconds spent in each stage of the night pattern
    #[arg(long, default_value_t = 30.0)]
    pub epoch_seconds: f64,

    /// Gaussian noise standard deviation in µV
    #[arg(long, default_value_t = 2.0)]
    pub noise: f64,

    /// Seed for reproducible noise
    #[arg(long)]
    pub seed: Option<u64>,

    /// Declare the record count as unknown
    #[arg(long)]
    pub unbounded: bool,

    /// Append a partial record of this many bytes
    #[arg(long, default_value_t = 0)]
    pub truncated_tail: usize,
}

/// Named window layouts
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WindowPreset {
    /// 10 s display, 30 s analysis, 1 s step
    LivePreview,
    /// 30 s windows advanced one scoring epoch at a time
    EpochScoring,
}

impl WindowPreset {
    pub fn config(self) -> WindowConfig {
        match self {
            WindowPreset::LivePreview => WindowConfig::live_preview(),
            WindowPreset::EpochScoring => WindowConfig::epoch_scoring(),
        }
    }
}
