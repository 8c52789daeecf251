//! Error kinds for the analytics driver.
//!
//! `ArgError` and `IoError` are recoverable: they propagate to `main` and
//! become a documented exit code plus a stderr message. `OomError` and
//! `SchemaError` are *not* represented here as `Result` variants: per the
//! error-handling design, malformed data and allocation failure are fatal
//! and are raised as panics (see [`crate::parse::schema_error`] and
//! arena allocation), trading robustness for throughput.

use std::fmt;

/// Recoverable top-level errors, mapped to process exit codes in `main`.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Bad CLI invocation: unknown flag, duplicate computation, missing path.
    #[error("{0}")]
    Arg(ArgError),

    /// File couldn't be opened, or the read buffer couldn't be allocated.
    #[error("{0}")]
    Io(IoError),
}

impl AnalyticsError {
    /// The process exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            AnalyticsError::Arg(_) => 2,
            AnalyticsError::Io(_) => 1,
        }
    }
}

/// Argument-parsing failure, carrying the exact user-facing message.
#[derive(Debug)]
pub struct ArgError(pub String);

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ArgError {}

impl From<ArgError> for AnalyticsError {
    fn from(e: ArgError) -> Self {
        AnalyticsError::Arg(e)
    }
}

/// File-open / buffer-allocation failure.
#[derive(Debug)]
pub struct IoError(pub String);

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {}

impl From<IoError> for AnalyticsError {
    fn from(e: IoError) -> Self {
        AnalyticsError::Io(e)
    }
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError(e.to_string())
    }
}
