//! Record mapping error types

use thiserror::Error;

/// Errors raised while turning store rows into records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The row's time column didn't parse
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    /// A result column maps to no field of the collection
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// The row shape doesn't match its series columns
    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

/// Result type for record mapping
pub type RecordResult<T> = Result<T, RecordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecordError::MalformedTimestamp("yesterday".to_string());
        assert_eq!(err.to_string(), "Malformed timestamp: yesterday");
    }
}
