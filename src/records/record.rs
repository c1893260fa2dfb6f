//! Flat typed records

use crate::catalog::DataType;
use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A typed scalar
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Float(f64),
    Integer(i64),
    String(String),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Null,
}

impl Value {
    /// Convert a JSON cell, using the catalog type to settle numeric kind
    ///
    /// InfluxDB renders whole floats without a fraction, so a float field
    /// can arrive as `1`. Returns `None` for arrays and objects.
    pub fn from_json(value: &serde_json::Value, data_type: Option<DataType>) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Number(n) => {
                if data_type != Some(DataType::Float) {
                    if let Some(i) = n.as_i64() {
                        return Some(Self::Integer(i));
                    }
                }
                n.as_f64().map(Self::Float)
            }
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            Self::Null => write!(f, "null"),
        }
    }
}

/// One result row: the timestamp first, then fields in result order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(timestamp_alias: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            fields: vec![(timestamp_alias.into(), Value::Timestamp(timestamp))],
        }
    }

    /// Append a field; a name already present is replaced in place
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder method: add a field
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self.fields.first() {
            Some((_, Value::Timestamp(ts))) => Some(*ts),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
