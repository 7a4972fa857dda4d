use thiserror::Error;

/// Custom error types for the MockMate server
#[derive(Debug, Error)]
pub enum MockMateError {
    /// Session validation errors
    #[error("Invalid session title: {0}")]
    InvalidTitle(String),

    #[error("Invalid session description: {0}")]
    InvalidDescription(String),

    #[error("Invalid session duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid participant email: {0}")]
    InvalidEmail(String),

    #[error("Duplicate participant email: {0}")]
    DuplicateEmail(String),

    #[error("Invalid participant role: {0}")]
    InvalidRole(String),

    /// Session registry errors
    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Session id mismatch: path {path}, body {body}")]
    SessionIdMismatch { path: String, body: String },

    /// Feedback errors
    #[error("Rating for {criterion} out of range: {value} (expected 1-5)")]
    RatingOutOfRange { criterion: &'static str, value: u8 },

    #[error("Feedback comments must not be empty")]
    EmptyComments,

    /// Chat errors
    #[error("Message content must not be empty")]
    EmptyMessage,

    /// Serialization errors
    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Generic errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results using MockMateError
pub type Result<T> = std::result::Result<T, MockMateError>;

impl MockMateError {
    /// Helper to create Internal errors with context
    pub fn internal(msg: impl Into<String>) -> Self {
        MockMateError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MockMateError::SessionNotFound("session-000042".to_string());
        assert_eq!(err.to_string(), "Session session-000042 not found");
    }

    #[test]
    fn test_rating_display() {
        let err = MockMateError::RatingOutOfRange {
            criterion: "clarity",
            value: 7,
        };
        assert_eq!(
            err.to_string(),
            "Rating for clarity out of range: 7 (expected 1-5)"
        );
    }

    #[test]
    fn test_error_helpers() {
        let err = MockMateError::internal("Something went wrong");
        assert!(matches!(err, MockMateError::Internal(_)));
    }

    #[test]
    fn test_serde_errors_convert() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = MockMateError::from(parse_err);
        assert!(matches!(err, MockMateError::SerializationFailed(_)));
    }
}
