//! Store client error types
//!
//! Every failure talking to InfluxDB surfaces as a [`StoreError`]. The engine
//! propagates these unmodified and never retries.

use thiserror::Error;

/// Errors raised by a [`StoreClient`](super::StoreClient)
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport failure (connect, timeout, TLS, body read)
    #[error("Store communication error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status from the /query endpoint
    #[error("Store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The store accepted the request but rejected the statement
    #[error("Store rejected query: {0}")]
    Query(String),

    /// The response body did not have the expected shape
    #[error("Malformed store response: {0}")]
    Decode(String),

    /// The data source name could not be used
    #[error("Invalid DSN: {0}")]
    InvalidDsn(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Status {
            status: 401,
            message: "authorization failed".to_string(),
        };
        assert_eq!(err.to_string(), "Store returned HTTP 401: authorization failed");

        let err = StoreError::Query("database not found: nope".to_string());
        assert_eq!(err.to_string(), "Store rejected query: database not found: nope");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
