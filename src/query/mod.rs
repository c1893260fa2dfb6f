//! InfluxQL Query Translation
//!
//! Turns a structured read request into InfluxQL text:
//!
//! - **ast**: request types ([`QuerySpec`], [`FilterExpression`], ...)
//! - **parser**: `$filter` text → [`FilterExpression`]
//! - **filter**: [`FilterExpression`] → `WHERE` predicate
//! - **builder**: [`QuerySpec`] + paging → full `SELECT` statement
//!
//! # Generated Queries
//!
//! ```text
//! SELECT * FROM "Testing 123" WHERE tag1 = 'foo' LIMIT 50 OFFSET 100
//! SELECT mean(float_field) AS float_field FROM "cpu" GROUP BY "host",time(1h)
//! SELECT COUNT(*) FROM "cpu" WHERE time >= '2016-01-01 00:00:00'
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use odata_influxdb::query::{build, parse_filter, QuerySpec};
//!
//! let spec = QuerySpec::new(collection, "timestamp")
//!     .filter(parse_filter("tag1 eq 'foo'")?);
//! let text = build(&spec, paginator.state())?;
//! ```

mod ast;
mod builder;
mod error;
mod filter;
mod parser;

pub use ast::{
    ComparisonOperator, FilterExpression, GroupTerm, Literal, LogicalOperator, Operand, Projection,
    QuerySpec,
};
pub use builder::{build, count_query, groupby_clause, limit_clause, orderby_clause};
pub use error::{QueryError, QueryResult};
pub use filter::{compile, where_clause};
pub use parser::parse_filter;

/// Double-quote an identifier, escaping embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\\\""))
}

/// Render an identifier bare when it is a plain word, quoted otherwise
pub fn identifier(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        quote_identifier(name)
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
