//! Schema Catalog
//!
//! A [`Catalog`] is an immutable snapshot of the store's schema: one
//! [`CollectionDescriptor`] per (database, measurement) pair, addressed by
//! its mangled collection id.
//!
//! - **mangle**: collection id ↔ raw name mapping
//! - **discovery**: builds a catalog from a live store
//! - **schema_doc**: renders a catalog as an EDMX metadata document
//!
//! # Publishing
//!
//! ```text
//! discover() → Catalog → CatalogHandle::replace() → readers see new Arc
//! ```
//!
//! Readers hold an `Arc<Catalog>` for as long as they need it; a refresh
//! never changes a snapshot someone already holds.

mod discovery;
mod error;
pub mod mangle;
mod schema_doc;

pub use discovery::discover;
pub use error::{CatalogError, CatalogResult};
pub use schema_doc::{
    edm_type, generate_schema_document, write_schema_document, SchemaDocumentOptions,
};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Catalog data type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float,
    Integer,
    String,
}

impl DataType {
    /// Map a declared InfluxDB field type; unknown or absent types are strings
    pub fn from_influx(field_type: Option<&str>) -> Self {
        match field_type {
            Some("float") => Self::Float,
            Some("integer") => Self::Integer,
            _ => Self::String,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float => write!(f, "float"),
            Self::Integer => write!(f, "integer"),
            Self::String => write!(f, "string"),
        }
    }
}

/// Whether a field is a tag key or a field key in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Tag,
    Metric,
}

/// One addressable property of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub data_type: DataType,
}

impl FieldDescriptor {
    pub fn metric(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Metric,
            data_type,
        }
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Tag,
            data_type: DataType::String,
        }
    }
}

/// One (database, measurement) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub database: String,
    pub measurement: String,
    pub mangled_id: String,
    pub fields: Vec<FieldDescriptor>,
}

impl CollectionDescriptor {
    /// Create a descriptor; the id is derived from the raw names
    pub fn new(
        database: impl Into<String>,
        measurement: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        let database = database.into();
        let measurement = measurement.into();
        let mangled_id = mangle::mangle(&database, &measurement);
        Self {
            database,
            measurement,
            mangled_id,
            fields,
        }
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Tag fields, in catalog order
    pub fn tags(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Tag)
    }

    fn raw_label(&self) -> String {
        format!("{}.{}", self.database, self.measurement)
    }
}

/// Name-indexed fields of one collection
#[derive(Debug, Clone, Default)]
pub struct FieldLookup {
    by_name: HashMap<String, FieldDescriptor>,
}

impl FieldLookup {
    pub fn new(collection: &CollectionDescriptor) -> Self {
        Self {
            by_name: collection
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.clone()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

/// Immutable schema snapshot
#[derive(Debug, Default)]
pub struct Catalog {
    collections: BTreeMap<String, Arc<CollectionDescriptor>>,
    /// Read-through cache of field lookups, filled on first use per collection
    lookups: RwLock<HashMap<String, Arc<FieldLookup>>>,
}

impl Catalog {
    /// Build a catalog, rejecting ids that collide or don't round-trip
    pub fn from_collections(
        collections: impl IntoIterator<Item = CollectionDescriptor>,
    ) -> CatalogResult<Self> {
        let mut by_id: BTreeMap<String, Arc<CollectionDescriptor>> = BTreeMap::new();

        for collection in collections {
            let id = collection.mangled_id.clone();

            if let Some(existing) = by_id.get(&id) {
                return Err(CatalogError::NameCollision {
                    id,
                    existing: existing.raw_label(),
                    incoming: collection.raw_label(),
                });
            }

            let decoded = mangle::unmangle(&id);
            if decoded.as_ref() != Some(&(collection.database.clone(), collection.measurement.clone())) {
                let existing = decoded
                    .map(|(db, m)| format!("{}.{}", db, m))
                    .unwrap_or_else(|| id.clone());
                return Err(CatalogError::NameCollision {
                    id,
                    existing,
                    incoming: collection.raw_label(),
                });
            }

            by_id.insert(id, Arc::new(collection));
        }

        Ok(Self {
            collections: by_id,
            lookups: RwLock::new(HashMap::new()),
        })
    }

    /// Get a collection by mangled id
    pub fn get(&self, id: &str) -> Option<&Arc<CollectionDescriptor>> {
        self.collections.get(id)
    }

    /// All collections, ordered by id
    pub fn collections(&self) -> impl Iterator<Item = &Arc<CollectionDescriptor>> {
        self.collections.values()
    }

    /// Collection ids, ordered
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Name-indexed fields for a collection, memoized per catalog
    pub fn field_lookup(&self, id: &str) -> Option<Arc<FieldLookup>> {
        if let Some(lookup) = self
            .lookups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return Some(Arc::clone(lookup));
        }

        let collection = self.collections.get(id)?;
        let lookup = Arc::new(FieldLookup::new(collection));
        self.lookups
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.to_string())
            .or_insert_with(|| Arc::clone(&lookup));
        Some(lookup)
    }
}

/// Shared, atomically replaceable catalog reference
#[derive(Debug)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// The catalog currently published
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Publish a new catalog, returning the one it replaced
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::new(Catalog::default())
    }
}
