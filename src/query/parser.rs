//! Filter Parser
//!
//! Parses OData v2 `$filter` text into a [`FilterExpression`] tree.
//!
//! # Supported Syntax
//!
//! ```text
//! expr       := and_expr ("or" and_expr)*
//! and_expr   := unary ("and" unary)*
//! unary      := "not" unary | "(" expr ")" | comparison
//! comparison := operand ("eq"|"ne"|"lt"|"le"|"gt"|"ge") operand
//! operand    := literal | property
//! ```
//!
//! # Examples
//!
//! ```text
//! prop eq 'test'
//! prop gt -32.53425D
//! timestamp ge datetime'2016-01-01T00:00:00' and tag1 ne 'o''brien'
//! ```
//!
//! The parser accepts `or` and `not`; whether they can be compiled is the
//! filter compiler's decision.

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{alpha1, char, digit1, multispace0, multispace1, one_of, satisfy},
    combinator::{map, map_opt, map_res, not, opt, peek, recognize, value},
    error::{Error as NomError, ErrorKind},
    multi::fold_many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::ast::{ComparisonOperator, FilterExpression, Literal, Operand};
use super::error::{QueryError, QueryResult};
use chrono::NaiveDateTime;

/// Parse `$filter` text into an expression tree
pub fn parse_filter(input: &str) -> QueryResult<FilterExpression> {
    let input = input.trim();
    if input.is_empty() {
        return Err(QueryError::Parse("empty filter".to_string()));
    }

    match or_expr(input) {
        Ok((remaining, expr)) => {
            if remaining.trim().is_empty() {
                Ok(expr)
            } else {
                Err(QueryError::Parse(format!(
                    "Unexpected input after filter: '{}'",
                    remaining.trim()
                )))
            }
        }
        Err(e) => Err(QueryError::Parse(format!("Parse error: {:?}", e))),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Match a keyword that isn't the prefix of a longer identifier
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(kw), not(peek(satisfy(is_ident_char))))
}

fn or_expr(input: &str) -> IResult<&str, FilterExpression> {
    let (input, first) = and_expr(input)?;
    fold_many0(
        preceded(delimited(multispace1, keyword("or"), multispace0), and_expr),
        move || first.clone(),
        FilterExpression::or,
    )(input)
}

fn and_expr(input: &str) -> IResult<&str, FilterExpression> {
    let (input, first) = unary_expr(input)?;
    fold_many0(
        preceded(delimited(multispace1, keyword("and"), multispace0), unary_expr),
        move || first.clone(),
        FilterExpression::and,
    )(input)
}

fn unary_expr(input: &str) -> IResult<&str, FilterExpression> {
    alt((
        map(
            preceded(pair(keyword("not"), multispace0), unary_expr),
            FilterExpression::negate,
        ),
        delimited(
            pair(char('('), multispace0),
            or_expr,
            pair(multispace0, char(')')),
        ),
        comparison,
    ))(input)
}

fn comparison(input: &str) -> IResult<&str, FilterExpression> {
    let (input, (left, _, operator, _, right)) = tuple((
        operand,
        multispace1,
        map_opt(alpha1, ComparisonOperator::from_keyword),
        multispace1,
        operand,
    ))(input)?;

    Ok((
        input,
        FilterExpression::Comparison {
            left,
            operator,
            right,
        },
    ))
}

fn operand(input: &str) -> IResult<&str, Operand> {
    alt((
        map(literal, Operand::Literal),
        map(property, |name: &str| Operand::Field(name.to_string())),
    ))(input)
}

/// Property name
fn property(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(is_ident_start),
        take_while(is_ident_char),
    ))(input)
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(datetime_literal, Literal::DateTime),
        map(string_literal, Literal::String),
        value(Literal::Boolean(true), keyword("true")),
        value(Literal::Boolean(false), keyword("false")),
        number_literal,
    ))(input)
}

/// `datetime'YYYY-MM-DDTHH:MM[:SS[.fff]]'`
fn datetime_literal(input: &str) -> IResult<&str, NaiveDateTime> {
    map_res(
        delimited(
            pair(tag_no_case("datetime"), char('\'')),
            take_while(|c| c != '\''),
            char('\''),
        ),
        parse_datetime,
    )(input)
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
}

/// Single-quoted string; `''` is an escaped quote
fn string_literal(input: &str) -> IResult<&str, String> {
    let (mut rest, _) = char('\'')(input)?;
    let mut out = String::new();

    loop {
        let (r, chunk) = take_while(|c| c != '\'')(rest)?;
        out.push_str(chunk);
        let (r, _) = char('\'')(r)?;

        match char::<&str, NomError<&str>>('\'')(r) {
            Ok((r, _)) => {
                out.push('\'');
                rest = r;
            }
            Err(_) => return Ok((r, out)),
        }
    }
}

/// Integer or decimal, with optional `L` (long) or `D`/`M`/`F` suffix
fn number_literal(input: &str) -> IResult<&str, Literal> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;
    let (rest, suffix) = opt(one_of("lLdDmMfF"))(rest)?;
    let (rest, _) = not(peek(satisfy(is_ident_char)))(rest)?;

    let is_decimal = text.contains(['.', 'e', 'E']);
    let literal = match suffix {
        Some('l' | 'L') if !is_decimal => text.parse::<i64>().ok().map(Literal::Integer),
        Some('l' | 'L') => None,
        Some(_) => text.parse::<f64>().ok().map(Literal::Float),
        None if is_decimal => text.parse::<f64>().ok().map(Literal::Float),
        None => text
            .parse::<i64>()
            .ok()
            .map(Literal::Integer)
            .or_else(|| text.parse::<f64>().ok().map(Literal::Float)),
    };

    match literal {
        Some(literal) => Ok((rest, literal)),
        None => Err(nom::Err::Error(NomError::new(input, ErrorKind::Float))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::LogicalOperator;
    use chrono::NaiveDate;

    fn cmp(field: &str, operator: ComparisonOperator, value: Literal) -> FilterExpression {
        FilterExpression::Comparison {
            left: Operand::field(field),
            operator,
            right: Operand::Literal(value),
        }
    }

    #[test]
    fn test_parse_string_comparison() {
        let expr = parse_filter("prop eq 'test'").unwrap();
        assert_eq!(
            expr,
            cmp("prop", ComparisonOperator::Eq, Literal::String("test".to_string()))
        );
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(
            parse_filter("prop gt 0").unwrap(),
            cmp("prop", ComparisonOperator::Gt, Literal::Integer(0))
        );
        assert_eq!(
            parse_filter("prop gt -32.53425D").unwrap(),
            cmp("prop", ComparisonOperator::Gt, Literal::Float(-32.53425))
        );
        assert_eq!(
            parse_filter("prop le 12L").unwrap(),
            cmp("prop", ComparisonOperator::Le, Literal::Integer(12))
        );
        assert_eq!(
            parse_filter("prop lt 1.5e3").unwrap(),
            cmp("prop", ComparisonOperator::Lt, Literal::Float(1500.0))
        );
    }

    #[test]
    fn test_parse_booleans_and_escaped_quotes() {
        assert_eq!(
            parse_filter("flag eq true").unwrap(),
            cmp("flag", ComparisonOperator::Eq, Literal::Boolean(true))
        );
        assert_eq!(
            parse_filter("name ne 'o''brien'").unwrap(),
            cmp("name", ComparisonOperator::Ne, Literal::String("o'brien".to_string()))
        );
        // property whose name starts with a keyword
        assert_eq!(
            parse_filter("trueish eq 1").unwrap(),
            cmp("trueish", ComparisonOperator::Eq, Literal::Integer(1))
        );
    }

    #[test]
    fn test_parse_datetime_range() {
        let expr = parse_filter(
            "timestamp ge datetime'2016-01-01T00:00:00' and timestamp le datetime'2016-12-31T00:00'",
        )
        .unwrap();

        let start = NaiveDate::from_ymd_opt(2016, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2016, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            expr,
            cmp("timestamp", ComparisonOperator::Ge, Literal::DateTime(start))
                .and(cmp("timestamp", ComparisonOperator::Le, Literal::DateTime(end)))
        );
    }

    #[test]
    fn test_and_is_left_nested() {
        let expr = parse_filter("a eq 1 and b eq 2 and c eq 3").unwrap();
        match expr {
            FilterExpression::Logical { operator, operands } => {
                assert_eq!(operator, LogicalOperator::And);
                assert_eq!(operands.len(), 2);
                assert!(matches!(operands[0], FilterExpression::Logical { .. }));
            }
            other => panic!("expected logical, got {:?}", other),
        }
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let expr = parse_filter("a eq 1 or b eq 2 and c eq 3").unwrap();
        match expr {
            FilterExpression::Logical { operator, operands } => {
                assert_eq!(operator, LogicalOperator::Or);
                assert!(matches!(
                    operands[1],
                    FilterExpression::Logical { operator: LogicalOperator::And, .. }
                ));
            }
            other => panic!("expected or, got {:?}", other),
        }
    }

    #[test]
    fn test_not_and_parentheses() {
        let expr = parse_filter("not (a eq 1)").unwrap();
        assert_eq!(
            expr,
            cmp("a", ComparisonOperator::Eq, Literal::Integer(1)).negate()
        );

        let expr = parse_filter("notes eq 'x'").unwrap();
        assert!(matches!(expr, FilterExpression::Comparison { .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_filter(""), Err(QueryError::Parse(_))));
        assert!(matches!(parse_filter("prop like 'x'"), Err(QueryError::Parse(_))));
        assert!(matches!(parse_filter("prop eq 'unterminated"), Err(QueryError::Parse(_))));
        assert!(matches!(parse_filter("prop eq 1 extra"), Err(QueryError::Parse(_))));
        assert!(matches!(
            parse_filter("timestamp ge datetime'yesterday'"),
            Err(QueryError::Parse(_))
        ));
    }
}
