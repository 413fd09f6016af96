//! Sleepwave-Stream: paced analysis streams over a recording channel
//!
//! [`StreamSession`] is the pull interface: each `next_event().await` is one
//! tick. [`spawn_stream`] runs a session on the tokio runtime and hands back
//! an event receiver plus a control sender.

pub mod config;
pub mod controller;
pub mod event;
pub mod session;

pub use config::{ChannelSelector, StreamConfig, Verbosity};
pub use controller::{spawn_stream, StreamCommand, StreamHandle, StreamOutcome};
pub use event::{EndReason, Snapshot, StreamEvent, StreamFailure, StreamSummary};
pub use session::StreamSession;
