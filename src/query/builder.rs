//! Query assembly
//!
//! Clauses are rendered independently and joined with single spaces in
//! fixed order: select, from, where, group by, order by, limit. Empty
//! clauses are dropped.

use super::ast::{GroupTerm, Projection, QuerySpec};
use super::error::{QueryError, QueryResult};
use super::filter::where_clause;
use super::{identifier, quote_identifier};
use crate::catalog::FieldKind;
use crate::paging::PageState;

/// Render the full `SELECT` statement for one page
pub fn build(spec: &QuerySpec, page: &PageState) -> QueryResult<String> {
    let clauses = [
        select_clause(spec)?,
        from_clause(spec),
        where_clause(spec.filter.as_ref(), &spec.timestamp_alias)?,
        groupby_clause(spec)?,
        orderby_clause(spec),
        limit_clause(page),
    ];
    let query = join_clauses(&clauses);
    tracing::debug!(collection = %spec.collection.mangled_id, %query, "built query");
    Ok(query)
}

/// Render the `SELECT COUNT(*)` statement honoring filter and grouping
pub fn count_query(spec: &QuerySpec) -> QueryResult<String> {
    let clauses = [
        "SELECT COUNT(*)".to_string(),
        from_clause(spec),
        where_clause(spec.filter.as_ref(), &spec.timestamp_alias)?,
        groupby_clause(spec)?,
    ];
    Ok(join_clauses(&clauses))
}

/// `GROUP BY "tag1","tag2",time(1h)`, or `""`
pub fn groupby_clause(spec: &QuerySpec) -> QueryResult<String> {
    if spec.group_by.is_empty() {
        return Ok(String::new());
    }

    let mut terms = Vec::with_capacity(spec.group_by.len());
    for term in &spec.group_by {
        match term {
            GroupTerm::Tag(name) => match spec.fields.get(name) {
                Some(field) if field.kind == FieldKind::Tag => terms.push(quote_identifier(name)),
                _ => {
                    return Err(QueryError::InvalidGroupBy(format!(
                        "'{}' is not a tag of {}",
                        name, spec.collection.mangled_id
                    )))
                }
            },
            GroupTerm::Time(interval) => terms.push(format!("time({})", interval)),
        }
    }
    Ok(format!("GROUP BY {}", terms.join(",")))
}

/// Ordering is never pushed down to the store
pub fn orderby_clause(_spec: &QuerySpec) -> String {
    String::new()
}

/// `LIMIT top [OFFSET skip]` while paging is active, otherwise `""`
pub fn limit_clause(page: &PageState) -> String {
    if !page.is_active() {
        return String::new();
    }
    if page.skip > 0 {
        format!("LIMIT {} OFFSET {}", page.top, page.skip)
    } else {
        format!("LIMIT {}", page.top)
    }
}

fn select_clause(spec: &QuerySpec) -> QueryResult<String> {
    let aggregate = match spec.aggregate.as_deref() {
        Some(func) if is_function_name(func) => Some(func),
        Some(func) => {
            return Err(QueryError::UnsupportedExpression(format!(
                "aggregate '{}'",
                func
            )))
        }
        None => None,
    };

    let fields: Vec<&str> = match &spec.projection {
        Projection::All => Vec::new(),
        Projection::Fields(names) => {
            let mut fields = Vec::with_capacity(names.len());
            for name in names {
                if *name == spec.timestamp_alias {
                    continue;
                }
                if !spec.fields.contains(name) {
                    return Err(QueryError::UnknownField(name.clone()));
                }
                fields.push(name.as_str());
            }
            fields
        }
    };

    let projection = if fields.is_empty() {
        match aggregate {
            Some(func) => format!("{}(*)", func),
            None => "*".to_string(),
        }
    } else {
        fields
            .iter()
            .map(|name| {
                let ident = identifier(name);
                match aggregate {
                    Some(func) => format!("{}({}) AS {}", func, ident, ident),
                    None => ident,
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    };

    Ok(format!("SELECT {}", projection))
}

fn from_clause(spec: &QuerySpec) -> String {
    format!("FROM {}", quote_identifier(&spec.collection.measurement))
}

fn is_function_name(func: &str) -> bool {
    !func.is_empty() && func.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn join_clauses(clauses: &[String]) -> String {
    clauses
        .iter()
        .filter(|c| !c.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CollectionDescriptor, DataType, FieldDescriptor};
    use crate::paging::{PageState, PagingMode};
    use crate::query::parse_filter;
    use std::sync::Arc;

    fn spec() -> QuerySpec {
        let collection = CollectionDescriptor::new(
            "testdb",
            "Testing 123",
            vec![
                FieldDescriptor::metric("float_field", DataType::Float),
                FieldDescriptor::metric("int_field", DataType::Integer),
                FieldDescriptor::tag("tag1"),
                FieldDescriptor::tag("tag2"),
            ],
        );
        QuerySpec::new(Arc::new(collection), "timestamp")
    }

    fn idle() -> PageState {
        PageState::new(50)
    }

    #[test]
    fn test_select_all() {
        assert_eq!(build(&spec(), &idle()).unwrap(), "SELECT * FROM \"Testing 123\"");
    }

    #[test]
    fn test_select_with_filter_and_page() {
        let spec = spec().filter(parse_filter("tag1 eq 'foo'").unwrap());
        let mut page = PageState::new(50);
        page.set_page(Some(10), Some(20), None);
        page.mode = PagingMode::SinglePage;

        assert_eq!(
            build(&spec, &page).unwrap(),
            "SELECT * FROM \"Testing 123\" WHERE tag1 = 'foo' LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_explicit_projection_drops_timestamp() {
        let spec = spec().projection(Projection::from_list(&["timestamp", "float_field", "tag1"]));
        assert_eq!(
            build(&spec, &idle()).unwrap(),
            "SELECT float_field,tag1 FROM \"Testing 123\""
        );

        let only_ts = spec.clone().projection(Projection::from_list(&["timestamp"]));
        assert_eq!(build(&only_ts, &idle()).unwrap(), "SELECT * FROM \"Testing 123\"");
    }

    #[test]
    fn test_aggregate_projection() {
        let spec = spec().aggregate("mean");
        assert_eq!(build(&spec, &idle()).unwrap(), "SELECT mean(*) FROM \"Testing 123\"");

        let spec = spec.projection(Projection::from_list(&["float_field", "int_field"]));
        assert_eq!(
            build(&spec, &idle()).unwrap(),
            "SELECT mean(float_field) AS float_field,mean(int_field) AS int_field FROM \"Testing 123\""
        );
    }

    #[test]
    fn test_unknown_projected_field() {
        let spec = spec().projection(Projection::from_list(&["nope"]));
        assert_eq!(
            build(&spec, &idle()),
            Err(QueryError::UnknownField("nope".to_string()))
        );
    }

    #[test]
    fn test_bad_aggregate_name() {
        let spec = spec().aggregate("mean(x); DROP");
        assert!(matches!(
            build(&spec, &idle()),
            Err(QueryError::UnsupportedExpression(_))
        ));
    }

    #[test]
    fn test_groupby_clause() {
        assert_eq!(groupby_clause(&spec()).unwrap(), "");

        let spec = spec()
            .aggregate("max")
            .group_by(GroupTerm::parse("tag1").unwrap())
            .group_by(GroupTerm::parse("tag2").unwrap())
            .group_by(GroupTerm::parse("time(1h)").unwrap());
        assert_eq!(
            groupby_clause(&spec).unwrap(),
            "GROUP BY \"tag1\",\"tag2\",time(1h)"
        );
        assert_eq!(
            build(&spec, &idle()).unwrap(),
            "SELECT max(*) FROM \"Testing 123\" GROUP BY \"tag1\",\"tag2\",time(1h)"
        );
    }

    #[test]
    fn test_groupby_rejects_non_tags() {
        let spec = spec().group_by(GroupTerm::Tag("float_field".to_string()));
        assert!(matches!(groupby_clause(&spec), Err(QueryError::InvalidGroupBy(_))));

        let spec = self::spec().group_by(GroupTerm::Tag("missing".to_string()));
        assert!(matches!(groupby_clause(&spec), Err(QueryError::InvalidGroupBy(_))));
    }

    #[test]
    fn test_orderby_is_empty() {
        assert_eq!(orderby_clause(&spec()), "");
    }

    #[test]
    fn test_count_query() {
        let spec = spec().filter(parse_filter("int_field gt 0").unwrap());
        assert_eq!(
            count_query(&spec).unwrap(),
            "SELECT COUNT(*) FROM \"Testing 123\" WHERE int_field > 0"
        );

        let grouped = spec.group_by(GroupTerm::Tag("tag1".to_string()));
        assert_eq!(
            count_query(&grouped).unwrap(),
            "SELECT COUNT(*) FROM \"Testing 123\" WHERE int_field > 0 GROUP BY \"tag1\""
        );
    }

    #[test]
    fn test_limit_clause() {
        let mut page = PageState::new(500);
        assert_eq!(limit_clause(&page), "");

        page.set_page(Some(100), None, None);
        page.mode = PagingMode::SinglePage;
        assert_eq!(limit_clause(&page), "LIMIT 100");

        page.set_page(Some(10), Some(10), None);
        page.mode = PagingMode::SinglePage;
        assert_eq!(limit_clause(&page), "LIMIT 10 OFFSET 10");
    }
}
