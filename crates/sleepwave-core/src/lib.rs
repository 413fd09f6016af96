//! Sleepwave-Core: recording format and channel decoding
//!
//! Header decoding, per-channel sample production and the window type shared
//! by the analysis and streaming layers.

pub mod error;
pub mod header;
pub mod samples;
pub mod window;

pub use error::{ErrorKind, WaveError, WaveResult};
pub use header::{RecordingHeader, Scaling, SignalDescriptor};
pub use samples::{open_channel, ChannelSamples, Exhaustion, ProducerState, RecordLayout};
pub use window::{SampleWindow, WindowStats};
