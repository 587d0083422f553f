use std::num::ParseIntError;
use thiserror::Error;

/// Errors produced while replaying a transport stream.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// File or socket I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The source file violates MPEG-TS framing.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Input too short or otherwise unusable.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Endpoint could not be resolved or connected.
    #[error("connection error: {0}")]
    Connection(String),

    /// A configuration value is out of range.
    #[error("config error: {0}")]
    Config(String),

    /// A numeric configuration value could not be parsed.
    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

impl ReplayError {
    /// Whether a supervisor may restart playback after this error.
    ///
    /// Malformed sources and bad configuration fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReplayError::Io(_) | ReplayError::Connection(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReplayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let io = ReplayError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert!(io.is_retryable());
        assert!(ReplayError::Connection("refused".into()).is_retryable());
        assert!(!ReplayError::Protocol("incorrect sync byte".into()).is_retryable());
        assert!(!ReplayError::Config("chunk size".into()).is_retryable());
    }

    #[test]
    fn test_display_prefixes() {
        let err = ReplayError::Protocol("incorrect sync byte".into());
        assert_eq!(err.to_string(), "protocol error: incorrect sync byte");
    }
}
