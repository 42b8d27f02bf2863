/*!
 * Error types for the dubsync application.
 *
 * The timing engine and the tempo reconciler report their own precondition
 * failures; media tooling and remote services report external failures that
 * must abort the whole dubbing job.
 */

use thiserror::Error;

/// Errors raised by the subtitle timer before any allocation happens
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimingError {
    /// A segment violates `start <= end` or the non-decreasing start order
    #[error("Malformed segment {position}: {reason}")]
    MalformedInput {
        /// Zero-based position of the offending segment
        position: usize,
        /// Human readable description of the violation
        reason: String,
    },
}

/// Errors raised when a tempo factor cannot be handed to the tempo filter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TempoError {
    /// Tempo is zero, negative, NaN or infinite
    #[error("Invalid tempo factor: {0}")]
    Invalid(f64),

    /// Tempo lies outside the configured operating range
    #[error("Tempo factor {tempo:.3} outside allowed range [{min:.3}, {max:.3}]")]
    OutOfRange {
        tempo: f64,
        min: f64,
        max: f64,
    },
}

/// Errors from the ffmpeg/ffprobe collaborators
#[derive(Error, Debug)]
pub enum MediaError {
    /// The tool binary could not be spawned
    #[error("Failed to execute {tool}: {message}")]
    Spawn {
        tool: String,
        message: String,
    },

    /// The tool ran but exited with a failure status
    #[error("{tool} failed: {stderr}")]
    ToolFailed {
        tool: String,
        stderr: String,
    },

    /// The tool did not finish in time
    #[error("{tool} timed out after {secs} seconds")]
    Timeout {
        tool: String,
        secs: u64,
    },

    /// The tool output could not be interpreted
    #[error("Unexpected {tool} output: {output}")]
    UnexpectedOutput {
        tool: String,
        output: String,
    },

    /// An input file is missing
    #[error("Media file not found: {0}")]
    MissingInput(String),
}

/// Errors from the transcription, translation and synthesis services
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The service answered but the payload is unusable
    #[error("Empty response from {0} service")]
    EmptyResponse(String),

    /// Local I/O around a service call failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ServiceError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}
