//! Filter parsing: one query-string pair into a WHERE-clause node.

use crate::ast::{Connective, Filter, FilterNode, FilterOp, LogicalFilter};
use crate::error::{QueryError, QueryResult};

use super::value::{coerce, coerce_scalar};
use super::{split_top_level, validate_column};

/// Parse a single non-reserved `(key, value)` pair.
///
/// `and`/`or` keys produce logical groups. Otherwise a recognized
/// `<operator>.<rest>` prefix selects the operator; a dotted value whose
/// prefix is not in the allowlist falls through to plain equality.
pub fn parse_filter(key: &str, value: &str) -> QueryResult<FilterNode> {
    if key == "and" || key == "or" {
        return parse_logical(key, value).map(FilterNode::Group);
    }

    validate_column(key)?;

    if let Some((token, rest)) = value.split_once('.') {
        if let Some(op) = FilterOp::from_token(token) {
            return Ok(FilterNode::Condition(Filter {
                column: key.to_string(),
                op,
                value: coerce(op, rest)?,
            }));
        }
    }

    Ok(FilterNode::Condition(Filter {
        column: key.to_string(),
        op: FilterOp::Eq,
        value: coerce_scalar(value),
    }))
}

fn parse_logical(connective: &str, value: &str) -> QueryResult<LogicalFilter> {
    let body = value
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| {
            QueryError::filter(connective, "logical filter must be wrapped in parentheses")
        })?;
    parse_logical_body(connective, body)
}

fn parse_logical_body(connective: &str, body: &str) -> QueryResult<LogicalFilter> {
    let conn = if connective == "and" {
        Connective::And
    } else {
        Connective::Or
    };

    let mut children = Vec::new();
    for part in split_top_level(body, ',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        // Nested logical group: and(...) / or(...)
        if let Some((head, rest)) = part.split_once('(') {
            if (head == "and" || head == "or") && rest.ends_with(')') {
                let inner = &rest[..rest.len() - 1];
                children.push(FilterNode::Group(parse_logical_body(head, inner)?));
                continue;
            }
        }

        // Leaf: <column>.<operator>.<value>
        let mut segments = part.splitn(3, '.');
        let (column, token, rest) = match (segments.next(), segments.next(), segments.next()) {
            (Some(column), Some(token), Some(rest)) => (column, token, rest),
            _ => {
                return Err(QueryError::filter(
                    connective,
                    format!("expected <column>.<operator>.<value>, got '{part}'"),
                ))
            }
        };
        validate_column(column)?;
        let op = FilterOp::from_token(token)
            .ok_or_else(|| QueryError::InvalidOperator(token.to_string()))?;
        children.push(FilterNode::Condition(Filter {
            column: column.to_string(),
            op,
            value: coerce(op, rest)?,
        }));
    }

    Ok(LogicalFilter {
        connective: conn,
        children,
    })
}
