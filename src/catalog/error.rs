//! Catalog error types

use crate::store::StoreError;
use thiserror::Error;

/// Errors raised while building or publishing a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Two raw (database, measurement) pairs map to the same collection id,
    /// or a pair's id decodes to a different pair
    #[error("Name collision on '{id}': {existing} and {incoming}")]
    NameCollision {
        id: String,
        existing: String,
        incoming: String,
    },

    /// Schema listing against the store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Writing the schema document failed
    #[error("Schema document error: {0}")]
    Document(#[from] quick_xml::Error),

    /// I/O while persisting the schema document
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::NameCollision {
            id: "internal__cpu".to_string(),
            existing: "_internal.cpu".to_string(),
            incoming: "internal.cpu".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Name collision on 'internal__cpu': _internal.cpu and internal.cpu"
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let err: CatalogError = StoreError::Query("boom".to_string()).into();
        assert!(matches!(err, CatalogError::Store(_)));
    }
}
