//! Exit codes for the pyrowatch CLI.
//!
//! Exit codes communicate the outcome without requiring output parsing.
//! They are stable across releases.

use pw_common::Error;

/// Exit codes for pyrowatch commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command completed
    Clean = 0,

    /// Replay finished and the series crossed its alert frame
    AlertReached = 1,

    /// Replay interrupted before the end of the series
    Interrupted = 6,

    /// Configuration error
    ConfigError = 10,

    /// Replay series missing, malformed or incompatible
    SeriesError = 11,

    /// Invalid playback request (e.g. a disallowed speed)
    PlaybackError = 12,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::AlertReached)
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidSeries(_)
            | Error::SeriesNotFound { .. }
            | Error::IncompatibleSchema { .. }
            | Error::Json(_) => ExitCode::SeriesError,
            Error::InvalidSpeed { .. } => ExitCode::PlaybackError,
            Error::Config(_) => ExitCode::ConfigError,
            Error::Io(_) | Error::Transport(_) => ExitCode::IoError,
            Error::RuntimeUnavailable(_) => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}
