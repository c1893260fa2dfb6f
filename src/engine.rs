//! Engine
//!
//! Owns the store client and the published catalog. Requests resolve a
//! mangled collection id to a [`CollectionHandler`], which pins the catalog
//! snapshot it was created from.
//!
//! ```rust,ignore
//! let engine = Engine::from_config(&config)?;
//! engine.refresh_catalog()?;
//!
//! let handler = engine.collection("telegraf__cpu")?;
//! let spec = handler.query().filter(parse_filter("host eq 'a'")?);
//! let mut pages = handler.paginator(&spec);
//! pages.set_page(Some(100), None, None);
//! for record in pages.iterate_page()? { ... }
//! ```

use crate::catalog::{
    discover, generate_schema_document, Catalog, CatalogHandle, CollectionDescriptor,
    SchemaDocumentOptions,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::paging::Paginator;
use crate::query::QuerySpec;
use crate::store::{HttpStoreClient, StoreClient};
use std::sync::Arc;

/// Engine-wide query settings
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Page size ceiling and default
    pub top_max: usize,
    /// Property name exposed for point timestamps
    pub timestamp_alias: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            top_max: 50,
            timestamp_alias: "timestamp".to_string(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_max: config.influxdb.max_items_per_query,
            timestamp_alias: config.query.timestamp_field.clone(),
        }
    }
}

/// Catalog owner and request entry point
pub struct Engine {
    store: Arc<dyn StoreClient>,
    catalog: CatalogHandle,
    settings: EngineSettings,
}

impl Engine {
    /// Create an engine with an empty catalog
    pub fn new(store: Arc<dyn StoreClient>, settings: EngineSettings) -> Self {
        Self {
            store,
            catalog: CatalogHandle::default(),
            settings,
        }
    }

    /// Create an engine around an already built catalog
    pub fn with_catalog(
        store: Arc<dyn StoreClient>,
        catalog: Catalog,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            catalog: CatalogHandle::new(catalog),
            settings,
        }
    }

    /// Create an HTTP-backed engine from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = HttpStoreClient::from_dsn(
            &config.influxdb.dsn,
            config.influxdb.request_timeout_secs * 1000,
        )?;
        Ok(Self::new(Arc::new(store), EngineSettings::from_config(config)))
    }

    /// Rediscover the schema and publish it
    ///
    /// The new catalog is built without holding the lock; readers keep
    /// whatever snapshot they already hold. On failure the current catalog
    /// stays published.
    pub fn refresh_catalog(&self) -> Result<Arc<Catalog>> {
        let catalog = discover(self.store.as_ref())?;
        let collections = catalog.len();
        let previous = self.catalog.replace(catalog);
        tracing::info!(collections, previous = previous.len(), "published catalog");
        Ok(self.catalog.snapshot())
    }

    /// The currently published catalog
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.snapshot()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn StoreClient> {
        &self.store
    }

    /// Resolve a mangled collection id
    pub fn collection(&self, id: &str) -> Result<CollectionHandler> {
        let catalog = self.catalog.snapshot();
        let descriptor = catalog
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownCollection(id.to_string()))?;

        Ok(CollectionHandler {
            store: Arc::clone(&self.store),
            catalog,
            descriptor,
            settings: self.settings.clone(),
        })
    }

    /// Render the current catalog as an EDMX document
    pub fn schema_document(&self) -> Result<String> {
        let options = SchemaDocumentOptions::default()
            .with_timestamp_alias(self.settings.timestamp_alias.as_str());
        Ok(generate_schema_document(&self.catalog.snapshot(), &options)?)
    }
}

/// Per-request access to one collection
pub struct CollectionHandler {
    store: Arc<dyn StoreClient>,
    catalog: Arc<Catalog>,
    descriptor: Arc<CollectionDescriptor>,
    settings: EngineSettings,
}

impl CollectionHandler {
    pub fn descriptor(&self) -> &CollectionDescriptor {
        &self.descriptor
    }

    /// A fresh query over this collection, selecting everything
    pub fn query(&self) -> QuerySpec {
        match self.catalog.field_lookup(&self.descriptor.mangled_id) {
            Some(fields) => QuerySpec::with_lookup(
                Arc::clone(&self.descriptor),
                fields,
                self.settings.timestamp_alias.as_str(),
            ),
            None => QuerySpec::new(
                Arc::clone(&self.descriptor),
                self.settings.timestamp_alias.as_str(),
            ),
        }
    }

    /// Paginator for `spec` with the engine's page ceiling
    pub fn paginator<'a>(&'a self, spec: &'a QuerySpec) -> Paginator<'a> {
        Paginator::new(self.store.as_ref(), spec, self.settings.top_max)
    }

    /// Estimated result count of `spec`
    pub fn count(&self, spec: &QuerySpec) -> Result<usize> {
        self.paginator(spec).count()
    }
}
