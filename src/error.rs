//! Crate-level error type
//!
//! Each module reports its own error enum; this type aggregates them for
//! operations that cross modules (paging, engine lookups).

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::query::QueryError;
use crate::records::RecordError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the engine
#[derive(Error, Debug)]
pub enum Error {
    /// The mangled id is not in the current catalog
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Catalog build failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Request could not be translated
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Result row could not be mapped
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Store call failed; never retried
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration loading failed
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;
