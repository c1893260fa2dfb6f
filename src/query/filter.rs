//! Filter compilation
//!
//! Translates a [`FilterExpression`] into an InfluxQL predicate. Only
//! conjunctions of comparisons translate; `or`, `not` and logical nodes with
//! other than two operands are rejected.

use super::ast::{FilterExpression, Literal, LogicalOperator, Operand};
use super::error::{QueryError, QueryResult};
use super::identifier;
use crate::store::TIME_COLUMN;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Compile a filter into predicate text; `None` compiles to `""`
pub fn compile(filter: Option<&FilterExpression>, timestamp_alias: &str) -> QueryResult<String> {
    match filter {
        None => Ok(String::new()),
        Some(expr) => compile_expr(expr, timestamp_alias),
    }
}

/// `WHERE <predicate>`, or `""` when there is no filter
pub fn where_clause(filter: Option<&FilterExpression>, timestamp_alias: &str) -> QueryResult<String> {
    let predicate = compile(filter, timestamp_alias)?;
    if predicate.is_empty() {
        Ok(predicate)
    } else {
        Ok(format!("WHERE {}", predicate))
    }
}

fn compile_expr(expr: &FilterExpression, timestamp_alias: &str) -> QueryResult<String> {
    match expr {
        FilterExpression::Comparison {
            left,
            operator,
            right,
        } => Ok(format!(
            "{} {} {}",
            render_operand(left, timestamp_alias)?,
            operator,
            render_operand(right, timestamp_alias)?
        )),
        FilterExpression::Logical {
            operator: LogicalOperator::And,
            operands,
        } => {
            if operands.len() != 2 {
                return Err(QueryError::UnsupportedExpression(format!(
                    "and with {} operands",
                    operands.len()
                )));
            }
            let left = compile_expr(&operands[0], timestamp_alias)?;
            let right = compile_expr(&operands[1], timestamp_alias)?;
            Ok(format!("{} AND {}", left, right))
        }
        FilterExpression::Logical {
            operator: LogicalOperator::Or,
            ..
        } => Err(QueryError::UnsupportedExpression("or".to_string())),
        FilterExpression::Not(_) => Err(QueryError::UnsupportedExpression("not".to_string())),
    }
}

fn render_operand(operand: &Operand, timestamp_alias: &str) -> QueryResult<String> {
    match operand {
        Operand::Field(name) if name == timestamp_alias => Ok(TIME_COLUMN.to_string()),
        Operand::Field(name) => Ok(identifier(name)),
        Operand::Literal(literal) => render_literal(literal),
    }
}

fn render_literal(literal: &Literal) -> QueryResult<String> {
    match literal {
        // embedded quotes are passed through unescaped
        Literal::String(s) => Ok(format!("'{}'", s)),
        Literal::Integer(v) => Ok(v.to_string()),
        Literal::Float(v) if v.is_finite() => Ok(v.to_string()),
        Literal::Float(v) => Err(QueryError::UnsupportedExpression(format!(
            "non-finite number {}",
            v
        ))),
        Literal::Boolean(v) => Ok(v.to_string()),
        Literal::DateTime(dt) => Ok(format!("'{}'", dt.format(DATETIME_FORMAT))),
    }
}
