//! Error types for PyroWatch.

use thiserror::Error;

/// Result type alias for PyroWatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for PyroWatch.
#[derive(Error, Debug)]
pub enum Error {
    // Series errors (10-19)
    #[error("invalid replay series: {0}")]
    InvalidSeries(String),

    #[error("replay series not found: {series_id}")]
    SeriesNotFound { series_id: String },

    #[error("incompatible replay schema version {found} (expected {expected})")]
    IncompatibleSchema { found: String, expected: String },

    // Playback errors (20-29)
    #[error("invalid playback speed {requested}x (allowed: {allowed:?})")]
    InvalidSpeed { requested: u32, allowed: Vec<u32> },

    // Upstream errors (30-39)
    #[error("transport error: {0}")]
    Transport(String),

    // Configuration errors (40-49)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Runtime errors (70-79)
    #[error("async runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidSeries(_) => 10,
            Error::SeriesNotFound { .. } => 11,
            Error::IncompatibleSchema { .. } => 12,
            Error::InvalidSpeed { .. } => 20,
            Error::Transport(_) => 30,
            Error::Config(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::RuntimeUnavailable(_) => 70,
        }
    }

    /// Whether the error came from an upstream collaborator and may succeed
    /// on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Io(_))
    }
}
