//! Sleepwave-Simulation: synthetic sleep recordings
//!
//! Stage-shaped EEG patterns rendered into complete recordings for tests,
//! demos and the `generate` command.

pub mod recording;
pub mod signal_patterns;

pub use recording::{generate_bytes, ChannelSpec, RecordingGenerator, RecordingSpec};
pub use signal_patterns::{stage_tones, SignalPattern, Tone};
