//! Domain error types

use thiserror::Error;

/// Errors that can occur while building or running a processing chain
///
/// Contract violations (advancing a cursor past what was reported) are not
/// represented here: they panic. End of stream is not an error either; it
/// is reported by `is_terminated` on the buffer ends.
#[derive(Error, Debug)]
pub enum SdrError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown window function: {0}")]
    UnknownWindow(String),

    #[error("Unsupported sample rate: {0}")]
    UnsupportedSampleRate(u32),

    #[error("Resampler error: {0}")]
    Resampler(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for chain operations
pub type SdrResult<T> = Result<T, SdrError>;
