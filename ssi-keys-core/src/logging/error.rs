//! Error types for the logging subsystem

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    /// A global subscriber was already installed, or the filter was rejected
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_error_display() {
        let err = LoggingError::InitializationFailed("already set".to_string());
        assert_eq!(err.to_string(), "Failed to initialize logging: already set");

        let err = LoggingError::InvalidLevel("loud".to_string());
        assert_eq!(err.to_string(), "Invalid log level: loud");
    }
}
