//! Query request types
//!
//! A [`QuerySpec`] describes one read against one collection: an optional
//! filter tree, a projection, an optional aggregate and group-by terms.
//! Paging lives in [`crate::paging`].
//!
//! # Filter trees
//!
//! ```text
//! timestamp ge datetime'2016-01-01T00:00:00' and tag1 eq 'foo'
//!
//! Logical(And)
//!   ├── Comparison(Field("timestamp") >= DateTime(2016-01-01 00:00:00))
//!   └── Comparison(Field("tag1") = String("foo"))
//! ```

use super::error::{QueryError, QueryResult};
use crate::catalog::{CollectionDescriptor, FieldLookup};
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOperator {
    /// Parse an OData operator keyword (`eq`, `ne`, ...)
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// Logical connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
        }
    }
}

/// A literal value in a filter
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Naive datetime, no zone
    DateTime(NaiveDateTime),
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<NaiveDateTime> for Literal {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(String),
    Literal(Literal),
}

impl Operand {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        Self::Literal(value.into())
    }
}

/// A filter expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    Comparison {
        left: Operand,
        operator: ComparisonOperator,
        right: Operand,
    },
    Logical {
        operator: LogicalOperator,
        operands: Vec<FilterExpression>,
    },
    Not(Box<FilterExpression>),
}

impl FilterExpression {
    /// `field <op> literal`
    pub fn compare(
        field: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<Literal>,
    ) -> Self {
        Self::Comparison {
            left: Operand::field(field),
            operator,
            right: Operand::literal(value),
        }
    }

    pub fn and(self, other: FilterExpression) -> Self {
        Self::Logical {
            operator: LogicalOperator::And,
            operands: vec![self, other],
        }
    }

    pub fn or(self, other: FilterExpression) -> Self {
        Self::Logical {
            operator: LogicalOperator::Or,
            operands: vec![self, other],
        }
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Every field name referenced anywhere in the tree
    pub fn field_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Comparison { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Field(name) = operand {
                        out.push(name);
                    }
                }
            }
            Self::Logical { operands, .. } => {
                for operand in operands {
                    operand.collect_fields(out);
                }
            }
            Self::Not(inner) => inner.collect_fields(out),
        }
    }
}

/// Which fields a query returns
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Projection {
    #[default]
    All,
    Fields(Vec<String>),
}

impl Projection {
    /// Build from a `$select`-style list; empty or `*` means all
    pub fn from_list<S: AsRef<str>>(fields: &[S]) -> Self {
        let fields: Vec<String> = fields
            .iter()
            .map(|f| f.as_ref().trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();

        if fields.is_empty() || fields.iter().any(|f| f == "*") {
            Self::All
        } else {
            Self::Fields(fields)
        }
    }
}

/// A `GROUP BY` term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupTerm {
    /// Partition by tag value
    Tag(String),
    /// Bucket by time interval, e.g. `1h`
    Time(String),
}

fn time_term_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^time\(\s*([^)]*?)\s*\)$").ok())
        .as_ref()
}

fn duration_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+(ns|us|u|µs|µ|ms|s|m|h|d|w))+$").ok())
        .as_ref()
}

impl GroupTerm {
    /// Parse `tag` or `time(<duration>)`
    pub fn parse(term: &str) -> QueryResult<Self> {
        let term = term.trim();
        if let Some(caps) = time_term_regex().and_then(|re| re.captures(term)) {
            let interval = caps.get(1).map_or("", |m| m.as_str());
            return Self::time(interval);
        }
        if term.is_empty() || term.contains(['(', ')', ',']) {
            return Err(QueryError::InvalidGroupBy(term.to_string()));
        }
        Ok(Self::Tag(term.to_string()))
    }

    /// A time bucket; the interval must be an InfluxQL duration literal
    pub fn time(interval: &str) -> QueryResult<Self> {
        if duration_regex().is_some_and(|re| re.is_match(interval)) {
            Ok(Self::Time(interval.to_string()))
        } else {
            Err(QueryError::InvalidGroupBy(format!("time({})", interval)))
        }
    }
}

/// One read request against one collection
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub collection: Arc<CollectionDescriptor>,
    /// Name index over the collection's fields
    pub fields: Arc<FieldLookup>,
    pub filter: Option<FilterExpression>,
    pub projection: Projection,
    /// InfluxQL aggregate function name, e.g. `mean`
    pub aggregate: Option<String>,
    pub group_by: Vec<GroupTerm>,
    /// Property name the caller uses for point timestamps
    pub timestamp_alias: String,
}

impl QuerySpec {
    pub fn new(collection: Arc<CollectionDescriptor>, timestamp_alias: impl Into<String>) -> Self {
        let fields = Arc::new(FieldLookup::new(&collection));
        Self::with_lookup(collection, fields, timestamp_alias)
    }

    /// Use an existing (usually catalog-cached) field lookup
    pub fn with_lookup(
        collection: Arc<CollectionDescriptor>,
        fields: Arc<FieldLookup>,
        timestamp_alias: impl Into<String>,
    ) -> Self {
        Self {
            collection,
            fields,
            filter: None,
            projection: Projection::All,
            aggregate: None,
            group_by: Vec::new(),
            timestamp_alias: timestamp_alias.into(),
        }
    }

    /// Builder method: set the filter
    pub fn filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Builder method: set the projection
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Builder method: set the aggregate function
    pub fn aggregate(mut self, func: impl Into<String>) -> Self {
        self.aggregate = Some(func.into());
        self
    }

    /// Builder method: add a group-by term
    pub fn group_by(mut self, term: GroupTerm) -> Self {
        self.group_by.push(term);
        self
    }

    /// True when results are partitioned into groups
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }
}
