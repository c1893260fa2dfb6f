//! Result mapping
//!
//! Each series is planned once (which column feeds which field) and its rows
//! are then mapped lazily. Series tag-sets are merged into every record of
//! the series.

use super::error::{RecordError, RecordResult};
use super::record::{Record, Value};
use crate::catalog::{CollectionDescriptor, FieldLookup};
use crate::query::{Projection, QuerySpec};
use crate::store::{ResultSet, Series, TIME_COLUMN};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::Arc;

/// InfluxQL functions whose name prefixes output columns, e.g. `mean_value`
const FUNCTION_PREFIXES: &[&str] = &[
    "bottom", "count", "cumulative_sum", "derivative", "difference", "distinct", "elapsed",
    "first", "integral", "last", "max", "mean", "median", "min", "mode", "moving_average",
    "non_negative_derivative", "percentile", "sample", "spread", "stddev", "sum", "top",
];

/// Parse a store timestamp; fractional seconds are optional
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let format = if raw.contains('.') {
        "%Y-%m-%dT%H:%M:%S%.fZ"
    } else {
        "%Y-%m-%dT%H:%M:%SZ"
    };
    NaiveDateTime::parse_from_str(raw, format).ok()
}

/// Maps result sets for one query into records
#[derive(Debug, Clone)]
pub struct ResultMapper {
    collection: Arc<CollectionDescriptor>,
    fields: Arc<FieldLookup>,
    projection: Projection,
    aggregate: Option<String>,
    timestamp_alias: String,
}

impl ResultMapper {
    pub fn new(spec: &QuerySpec) -> Self {
        Self {
            collection: Arc::clone(&spec.collection),
            fields: Arc::clone(&spec.fields),
            projection: spec.projection.clone(),
            aggregate: spec.aggregate.clone(),
            timestamp_alias: spec.timestamp_alias.clone(),
        }
    }

    /// Lazily map every row of `result`, in store order
    pub fn map(&self, result: ResultSet) -> RecordStream {
        RecordStream {
            mapper: self.clone(),
            series: result.series.into_iter(),
            current: None,
            finished: false,
        }
    }

    fn plan(&self, series: &Series) -> RecordResult<SeriesPlan> {
        let time_idx = series.column_index(TIME_COLUMN).ok_or_else(|| {
            RecordError::MalformedRow(format!("series '{}' has no time column", series.name))
        })?;
        let empty = BTreeMap::new();
        let tags = series.tags.as_ref().unwrap_or(&empty);

        let mut slots = Vec::new();
        match &self.projection {
            Projection::All => {
                for (idx, column) in series.columns.iter().enumerate() {
                    if idx == time_idx {
                        continue;
                    }
                    let name = self.resolve_column(column)?;
                    slots.push(self.column_slot(name, idx));
                }
                for (key, value) in tags {
                    if !slots.iter().any(|s| s.name() == key) {
                        slots.push(Slot::Constant {
                            name: key.clone(),
                            value: Value::String(value.clone()),
                        });
                    }
                }
            }
            Projection::Fields(names) => {
                for name in names {
                    if *name == self.timestamp_alias {
                        continue;
                    }
                    slots.push(self.projected_slot(series, tags, name)?);
                }
            }
        }

        Ok(SeriesPlan {
            time_idx,
            width: series.columns.len(),
            slots,
        })
    }

    /// Field name for a `*` result column
    fn resolve_column(&self, column: &str) -> RecordResult<String> {
        if self.fields.contains(column) {
            return Ok(column.to_string());
        }

        let active = self.aggregate.as_deref().into_iter();
        for func in active.chain(FUNCTION_PREFIXES.iter().copied()) {
            if let Some(field) = column
                .strip_prefix(func)
                .and_then(|rest| rest.strip_prefix('_'))
            {
                if self.fields.contains(field) {
                    return Ok(field.to_string());
                }
            }
        }

        Err(RecordError::UnknownField(format!(
            "{} (in {})",
            column, self.collection.mangled_id
        )))
    }

    fn projected_slot(
        &self,
        series: &Series,
        tags: &BTreeMap<String, String>,
        name: &str,
    ) -> RecordResult<Slot> {
        if let Some(idx) = series.column_index(name) {
            return Ok(self.column_slot(name.to_string(), idx));
        }
        if let Some(func) = &self.aggregate {
            if let Some(idx) = series.column_index(&format!("{}_{}", func, name)) {
                return Ok(self.column_slot(name.to_string(), idx));
            }
        }
        if let Some(value) = tags.get(name) {
            return Ok(Slot::Constant {
                name: name.to_string(),
                value: Value::String(value.clone()),
            });
        }
        if self.fields.contains(name) {
            // known field the store left out of this result
            return Ok(Slot::Constant {
                name: name.to_string(),
                value: Value::Null,
            });
        }
        Err(RecordError::UnknownField(name.to_string()))
    }

    fn column_slot(&self, name: String, idx: usize) -> Slot {
        let data_type = self.fields.get(&name).map(|f| f.data_type);
        Slot::Column {
            name,
            idx,
            data_type,
        }
    }
}

#[derive(Debug)]
enum Slot {
    Column {
        name: String,
        idx: usize,
        data_type: Option<crate::catalog::DataType>,
    },
    Constant {
        name: String,
        value: Value,
    },
}

impl Slot {
    fn name(&self) -> &str {
        match self {
            Self::Column { name, .. } | Self::Constant { name, .. } => name,
        }
    }
}

#[derive(Debug)]
struct SeriesPlan {
    time_idx: usize,
    width: usize,
    slots: Vec<Slot>,
}

#[derive(Debug)]
struct SeriesCursor {
    plan: SeriesPlan,
    rows: std::vec::IntoIter<Vec<serde_json::Value>>,
}

/// Lazy, single-pass stream of records over a result set
///
/// The first error ends the stream: a row with a bad timestamp or shape, or
/// a series whose columns can't be resolved, yields one `Err` and nothing
/// after it.
#[derive(Debug)]
pub struct RecordStream {
    mapper: ResultMapper,
    series: std::vec::IntoIter<Series>,
    current: Option<SeriesCursor>,
    finished: bool,
}

impl RecordStream {
    /// A stream with no records
    pub fn empty(mapper: ResultMapper) -> Self {
        mapper.map(ResultSet::empty())
    }

    fn map_row(&self, plan: &SeriesPlan, row: Vec<serde_json::Value>) -> RecordResult<Record> {
        if row.len() != plan.width {
            return Err(RecordError::MalformedRow(format!(
                "expected {} values, got {}",
                plan.width,
                row.len()
            )));
        }

        let timestamp = match &row[plan.time_idx] {
            serde_json::Value::String(raw) => parse_timestamp(raw)
                .ok_or_else(|| RecordError::MalformedTimestamp(raw.clone()))?,
            other => return Err(RecordError::MalformedTimestamp(other.to_string())),
        };

        let mut record = Record::new(self.mapper.timestamp_alias.as_str(), timestamp);
        for slot in &plan.slots {
            match slot {
                Slot::Column {
                    name,
                    idx,
                    data_type,
                } => {
                    let value = Value::from_json(&row[*idx], *data_type).ok_or_else(|| {
                        RecordError::MalformedRow(format!("non-scalar value in column '{}'", name))
                    })?;
                    record.insert(name.as_str(), value);
                }
                Slot::Constant { name, value } => record.insert(name.as_str(), value.clone()),
            }
        }
        Ok(record)
    }
}

impl Iterator for RecordStream {
    type Item = RecordResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(mut cursor) = self.current.take() {
                if let Some(row) = cursor.rows.next() {
                    let item = self.map_row(&cursor.plan, row);
                    match &item {
                        Ok(_) => self.current = Some(cursor),
                        Err(e) => {
                            tracing::warn!(
                                collection = %self.mapper.collection.mangled_id,
                                error = %e,
                                "row mapping failed, ending result stream"
                            );
                            self.finished = true;
                        }
                    }
                    return Some(item);
                }
            }

            let series = self.series.next()?;
            match self.mapper.plan(&series) {
                Ok(plan) => {
                    self.current = Some(SeriesCursor {
                        plan,
                        rows: series.values.into_iter(),
                    });
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
