//! Time-Series Store Access
//!
//! The engine only talks to InfluxDB through the [`StoreClient`] trait:
//!
//! - **execute**: run one InfluxQL statement against a database
//! - **list_***: schema listing, implemented on top of `execute` with
//!   `SHOW ...` statements unless a client overrides them
//!
//! [`HttpStoreClient`] implements the trait for the InfluxDB 1.x `/query`
//! HTTP API.
//!
//! # Result shape
//!
//! ```text
//! ResultSet
//!   └── Series { name, tags?, columns, values }
//!         └── row: [time, col1, col2, ...]
//! ```
//!
//! A query without `GROUP BY` yields one series per measurement; a grouped
//! query yields one series per tag-set.

mod dsn;
mod error;
mod http;

#[cfg(test)]
pub(crate) mod fake;

pub use dsn::{Dsn, Scheme};
pub use error::{StoreError, StoreResult};
pub use http::{HttpStoreClient, HttpStoreConfig};

use crate::query::quote_identifier;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Column name the store uses for point timestamps
pub const TIME_COLUMN: &str = "time";

/// One series of a statement result
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Series {
    /// Measurement name (or a listing name such as `databases`)
    #[serde(default)]
    pub name: String,
    /// Tag-set this series was partitioned by, when grouping was requested
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
    /// Column names, in row order
    #[serde(default)]
    pub columns: Vec<String>,
    /// Row values, positionally matching `columns`
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl Series {
    /// Create an ungrouped series
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            tags: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values: Vec::new(),
        }
    }

    /// Builder method: set the tag-set key
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Builder method: append a row
    pub fn row(mut self, values: Vec<serde_json::Value>) -> Self {
        self.values.push(values);
        self
    }

    /// Position of a column, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of rows in this series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the series has no rows
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of one executed statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub series: Vec<Series>,
}

impl ResultSet {
    /// Create a result set from series
    pub fn new(series: Vec<Series>) -> Self {
        Self { series }
    }

    /// An empty result (no series)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of rows across all series
    pub fn row_count(&self) -> usize {
        self.series.iter().map(Series::len).sum()
    }

    /// Collect a string column from every series, in order
    pub fn string_column(&self, column: &str) -> StoreResult<Vec<String>> {
        let mut out = Vec::new();
        for series in &self.series {
            let idx = series.column_index(column).ok_or_else(|| {
                StoreError::Decode(format!(
                    "series '{}' has no column '{}'",
                    series.name, column
                ))
            })?;
            for row in &series.values {
                match row.get(idx) {
                    Some(serde_json::Value::String(s)) => out.push(s.clone()),
                    other => {
                        return Err(StoreError::Decode(format!(
                            "expected string in column '{}', got {:?}",
                            column, other
                        )))
                    }
                }
            }
        }
        Ok(out)
    }
}

/// A field key as declared by `SHOW FIELD KEYS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey {
    pub name: String,
    /// Declared type (`float`, `integer`, `string`, `boolean`); `None` when
    /// the store did not report one
    pub field_type: Option<String>,
}

impl FieldKey {
    pub fn new(name: impl Into<String>, field_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.map(str::to_string),
        }
    }
}

/// Query interface to the time-series store
///
/// Implementations must be shareable across worker threads; every call is a
/// blocking round trip. Timeouts and cancellation belong to the
/// implementation and are reported as [`StoreError`].
pub trait StoreClient: Send + Sync {
    /// Execute one statement against `database` (empty for server-wide
    /// statements such as `SHOW DATABASES`)
    fn execute(&self, query: &str, database: &str) -> StoreResult<ResultSet>;

    /// List every database on the server
    fn list_databases(&self) -> StoreResult<Vec<String>> {
        self.execute("SHOW DATABASES", "")?.string_column("name")
    }

    /// List the measurements of one database
    fn list_measurements(&self, database: &str) -> StoreResult<Vec<String>> {
        self.execute("SHOW MEASUREMENTS", database)?
            .string_column("name")
    }

    /// List field keys with their declared types
    fn list_field_keys(&self, database: &str, measurement: &str) -> StoreResult<Vec<FieldKey>> {
        let query = format!("SHOW FIELD KEYS FROM {}", quote_identifier(measurement));
        let result = self.execute(&query, database)?;

        let mut keys = Vec::new();
        for series in &result.series {
            let name_idx = series.column_index("fieldKey").ok_or_else(|| {
                StoreError::Decode("SHOW FIELD KEYS result has no fieldKey column".to_string())
            })?;
            let type_idx = series.column_index("fieldType");

            for row in &series.values {
                let name = match row.get(name_idx) {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    other => {
                        return Err(StoreError::Decode(format!(
                            "expected field key name, got {:?}",
                            other
                        )))
                    }
                };
                let field_type = type_idx
                    .and_then(|i| row.get(i))
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                keys.push(FieldKey { name, field_type });
            }
        }
        Ok(keys)
    }

    /// List tag keys (always string typed)
    fn list_tag_keys(&self, database: &str, measurement: &str) -> StoreResult<Vec<String>> {
        let query = format!("SHOW TAG KEYS FROM {}", quote_identifier(measurement));
        self.execute(&query, database)?.string_column("tagKey")
    }
}

impl<T: StoreClient + ?Sized> StoreClient for std::sync::Arc<T> {
    fn execute(&self, query: &str, database: &str) -> StoreResult<ResultSet> {
        (**self).execute(query, database)
    }

    fn list_databases(&self) -> StoreResult<Vec<String>> {
        (**self).list_databases()
    }

    fn list_measurements(&self, database: &str) -> StoreResult<Vec<String>> {
        (**self).list_measurements(database)
    }

    fn list_field_keys(&self, database: &str, measurement: &str) -> StoreResult<Vec<FieldKey>> {
        (**self).list_field_keys(database, measurement)
    }

    fn list_tag_keys(&self, database: &str, measurement: &str) -> StoreResult<Vec<String>> {
        (**self).list_tag_keys(database, measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeStore;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_databases_and_measurements() {
        let store = FakeStore::new()
            .respond(
                "^SHOW DATABASES$",
                vec![Series::new("databases", &["name"])
                    .row(vec![json!("_internal")])
                    .row(vec![json!("database1")])],
            )
            .respond(
                "^SHOW MEASUREMENTS$",
                vec![Series::new("measurements", &["name"])
                    .row(vec![json!("measurement1")])
                    .row(vec![json!("measurement with spaces")])],
            );

        assert_eq!(
            store.list_databases().unwrap(),
            vec!["_internal", "database1"]
        );
        assert_eq!(
            store.list_measurements("database1").unwrap(),
            vec!["measurement1", "measurement with spaces"]
        );
    }

    #[test]
    fn test_list_field_keys_quotes_measurement() {
        let store = FakeStore::new().respond(
            "^SHOW FIELD KEYS FROM \"measurement with spaces\"$",
            vec![Series::new("measurement with spaces", &["fieldKey", "fieldType"])
                .row(vec![json!("float_field"), json!("float")])
                .row(vec![json!("int_field"), json!("integer")])],
        );

        let keys = store
            .list_field_keys("database1", "measurement with spaces")
            .unwrap();
        assert_eq!(
            keys,
            vec![
                FieldKey::new("float_field", Some("float")),
                FieldKey::new("int_field", Some("integer")),
            ]
        );
    }

    #[test]
    fn test_list_tag_keys_empty_measurement() {
        // A measurement without tags returns a statement with no series
        let store = FakeStore::new().respond("^SHOW TAG KEYS", vec![]);
        assert!(store.list_tag_keys("db", "m").unwrap().is_empty());
    }

    #[test]
    fn test_string_column_missing() {
        let set = ResultSet::new(vec![Series::new("databases", &["other"]).row(vec![json!("x")])]);
        assert!(matches!(set.string_column("name"), Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_row_count_across_series() {
        let set = ResultSet::new(vec![
            Series::new("m", &["time", "count"])
                .tag("tag1", "foo")
                .row(vec![json!("1970-01-01T00:00:00Z"), json!(3)]),
            Series::new("m", &["time", "count"])
                .tag("tag1", "bar")
                .row(vec![json!("1970-01-01T00:00:00Z"), json!(5)]),
        ]);
        assert_eq!(set.row_count(), 2);
    }
}
