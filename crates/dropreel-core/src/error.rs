//! Error types for DropReel.

use thiserror::Error;

/// Main error type for DropReel operations.
#[derive(Error, Debug)]
pub enum DropReelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Event log is empty, nothing to mix")]
    EmptyEventLog,

    #[error("Malformed event log at line {line}: {reason}")]
    MalformedEventLog { line: usize, reason: String },

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for DropReel operations.
pub type Result<T> = std::result::Result<T, DropReelError>;
