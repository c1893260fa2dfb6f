//! # odata-influxdb
//!
//! Exposes InfluxDB 1.x measurements as OData entity sets: discovers the
//! store's schema into a catalog, translates OData query options into
//! InfluxQL, and maps results back to flat records.
//!
//! ## Modules
//!
//! - [`store`]: InfluxDB `/query` client and result model
//! - [`catalog`]: Schema discovery, collection id mangling, EDMX document
//! - [`query`]: `$filter` parsing and InfluxQL generation
//! - [`records`]: Result-to-record mapping
//! - [`paging`]: `$top`/`$skip`/`$skiptoken` handling
//! - [`engine`]: Catalog owner and per-collection entry point
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use odata_influxdb::{parse_filter, Config, Engine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::from_config(&Config::load_default())?;
//!     engine.refresh_catalog()?;
//!
//!     let handler = engine.collection("telegraf__cpu")?;
//!     let spec = handler
//!         .query()
//!         .filter(parse_filter("host eq 'web01' and timestamp gt datetime'2024-01-01T00:00:00'")?);
//!
//!     let mut pages = handler.paginator(&spec);
//!     pages.set_page(Some(20), None, None);
//!     for record in pages.iterate_page()? {
//!         println!("{}", serde_json::to_string(&record?)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod paging;
pub mod query;
pub mod records;
pub mod store;

pub use catalog::{
    discover, generate_schema_document, write_schema_document, Catalog, CatalogError,
    CatalogHandle, CollectionDescriptor, DataType, FieldDescriptor, FieldKind,
    SchemaDocumentOptions,
};

pub use config::{Config, ConfigError};

pub use engine::{CollectionHandler, Engine, EngineSettings};

pub use error::{Error, Result};

pub use paging::{PageState, Paginator, PagingMode};

pub use query::{
    build, count_query, parse_filter, FilterExpression, GroupTerm, Projection, QueryError,
    QuerySpec,
};

pub use records::{Record, RecordError, RecordStream, ResultMapper, Value};

pub use store::{Dsn, HttpStoreClient, ResultSet, Series, StoreClient, StoreError};
