//! Schema discovery
//!
//! Walks the store once: databases, then measurements per database, then
//! field and tag keys per measurement.

use super::{Catalog, CatalogResult, CollectionDescriptor, DataType, FieldDescriptor};
use crate::store::StoreClient;
use std::collections::HashSet;
use std::time::Instant;

/// Build a fresh catalog from the store's live schema
///
/// Costs one round trip per database plus two per measurement. The result is
/// a new snapshot; publishing it is up to the caller.
pub fn discover(store: &dyn StoreClient) -> CatalogResult<Catalog> {
    let start = Instant::now();
    let databases = store.list_databases()?;
    let mut collections = Vec::new();

    for database in &databases {
        let measurements = store.list_measurements(database)?;
        tracing::debug!(db = %database, measurements = measurements.len(), "discovered database");

        for measurement in measurements {
            let fields = discover_fields(store, database, &measurement)?;
            collections.push(CollectionDescriptor::new(database.as_str(), measurement, fields));
        }
    }

    let catalog = Catalog::from_collections(collections)?;
    tracing::info!(
        databases = databases.len(),
        collections = catalog.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "schema discovery complete"
    );
    Ok(catalog)
}

fn discover_fields(
    store: &dyn StoreClient,
    database: &str,
    measurement: &str,
) -> CatalogResult<Vec<FieldDescriptor>> {
    let mut fields = Vec::new();
    let mut seen = HashSet::new();

    for key in store.list_field_keys(database, measurement)? {
        if !seen.insert(key.name.clone()) {
            continue;
        }
        let data_type = DataType::from_influx(key.field_type.as_deref());
        fields.push(FieldDescriptor::metric(key.name, data_type));
    }

    for tag in store.list_tag_keys(database, measurement)? {
        if seen.contains(&tag) {
            tracing::warn!(
                db = %database,
                measurement = %measurement,
                name = %tag,
                "name is both a tag and a field key; keeping the field"
            );
            continue;
        }
        seen.insert(tag.clone());
        fields.push(FieldDescriptor::tag(tag));
    }

    Ok(fields)
}
