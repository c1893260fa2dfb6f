//! Query error types
//!
//! Errors raised while parsing filter text or compiling a request into
//! InfluxQL. None of these touch the store.

use thiserror::Error;

/// Errors that can occur while building a query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The filter uses a construct InfluxQL translation can't express
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A projected or filtered field is not part of the collection
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// A group-by term is neither a tag nor a valid `time(interval)`
    #[error("Invalid group by: {0}")]
    InvalidGroupBy(String),

    /// Filter text could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
