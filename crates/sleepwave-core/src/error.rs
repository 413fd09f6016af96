//! Error handling for the Sleepwave pipeline
//!
//! Every fallible operation in the workspace returns [`WaveResult`]. Variants
//! collapse onto the small [`ErrorKind`] taxonomy that travels inside stream
//! error events.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for Sleepwave operations
pub type WaveResult<T> = Result<T, WaveError>;

/// Error type for all Sleepwave operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WaveError {
    /// Preamble or metadata blocks could not be parsed
    #[error("Malformed header: {reason}")]
    MalformedHeader {
        /// Description of the header problem
        reason: String,
    },

    /// Channel has an empty or inverted digital range
    #[error("Invalid scaling for channel '{channel}': digital range [{digital_min}, {digital_max}]")]
    InvalidScaling {
        /// Channel label
        channel: String,
        /// Declared digital minimum
        digital_min: i32,
        /// Declared digital maximum
        digital_max: i32,
    },

    /// Requested channel index is out of range
    #[error("Invalid channel: index {requested}, recording has {available} channels")]
    InvalidChannel {
        /// Requested channel index
        requested: usize,
        /// Number of channels in the recording
        available: usize,
    },

    /// No channel carries the requested label
    #[error("Channel '{label}' not found. Available: {available:?}")]
    UnknownChannel {
        /// Requested label
        label: String,
        /// Labels present in the recording
        available: Vec<String>,
    },

    /// Configuration values that cannot drive a stream
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error
        reason: String,
    },

    /// Underlying storage could not be read
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Closed set of error categories reported to stream consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedHeader,
    InvalidChannel,
    InvalidConfig,
    IoFailure,
}

impl WaveError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            WaveError::MalformedHeader { .. } | WaveError::InvalidScaling { .. } => {
                ErrorKind::MalformedHeader
            }
            WaveError::InvalidChannel { .. } | WaveError::UnknownChannel { .. } => {
                ErrorKind::InvalidChannel
            }
            WaveError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            WaveError::Io(_) => ErrorKind::IoFailure,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        WaveError::MalformedHeader {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedHeader => "MalformedHeader",
            ErrorKind::InvalidChannel => "InvalidChannel",
            ErrorKind::InvalidConfig => "InvalidConfig",
            ErrorKind::IoFailure => "IOFailure",
        };
        f.write_str(name)
    }
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)+) => {
        $crate::error::WaveError::InvalidConfig {
            reason: format!($($arg)+),
        }
    };
}
