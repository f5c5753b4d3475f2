//! Scalar coercion for filter values.
//!
//! Inputs are URL-decoded strings. Coercion order: integer, float,
//! boolean, string. Doubled single quotes unescape before the numeric
//! attempts.

use crate::ast::{FilterOp, Value};
use crate::error::{QueryError, QueryResult};

/// Coerce one scalar literal.
pub(crate) fn coerce_scalar(raw: &str) -> Value {
    let unescaped = raw.replace("''", "'");
    if let Ok(n) = unescaped.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(f) = unescaped.parse::<f64>() {
        return Value::Float(f);
    }
    if let Ok(b) = unescaped.parse::<bool>() {
        return Value::Bool(b);
    }
    Value::String(unescaped)
}

/// Coerce a filter value for the given operator.
///
/// `in` values are comma-separated lists, optionally wrapped in `()`,
/// with each element coerced independently. `is` accepts only `null` and
/// `not.null`.
pub(crate) fn coerce(op: FilterOp, raw: &str) -> QueryResult<Value> {
    match op {
        FilterOp::In => {
            let inner = raw
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .unwrap_or(raw);
            if inner.trim().is_empty() {
                return Ok(Value::List(vec![]));
            }
            let items = inner
                .split(',')
                .map(|item| coerce_scalar(item.trim()))
                .collect();
            Ok(Value::List(items))
        }
        FilterOp::Is => match raw {
            "null" => Ok(Value::Null),
            "not.null" => Ok(Value::NotNull),
            other => Err(QueryError::InvalidIsValue(other.to_string())),
        },
        _ => Ok(coerce_scalar(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercion_order() {
        assert_eq!(coerce_scalar("42"), Value::Int(42));
        assert_eq!(coerce_scalar("-7"), Value::Int(-7));
        assert_eq!(coerce_scalar("1.5"), Value::Float(1.5));
        assert_eq!(coerce_scalar("true"), Value::Bool(true));
        assert_eq!(coerce_scalar("false"), Value::Bool(false));
        assert_eq!(coerce_scalar("AC/DC"), Value::String("AC/DC".into()));
    }

    #[test]
    fn test_quote_unescaping() {
        assert_eq!(
            coerce_scalar("O''Brien"),
            Value::String("O'Brien".into())
        );
    }

    #[test]
    fn test_in_list_forms_parse_identically() {
        let wrapped = coerce(FilterOp::In, "(1,2,3)").unwrap();
        let bare = coerce(FilterOp::In, "1,2,3").unwrap();
        assert_eq!(wrapped, bare);
        assert_eq!(
            wrapped,
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_in_elements_coerced_independently() {
        let value = coerce(FilterOp::In, "(1,two,3.5)").unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Int(1),
                Value::String("two".into()),
                Value::Float(3.5)
            ])
        );
    }

    #[test]
    fn test_empty_in_list() {
        assert_eq!(coerce(FilterOp::In, "()").unwrap(), Value::List(vec![]));
    }

    #[test]
    fn test_is_values() {
        assert_eq!(coerce(FilterOp::Is, "null").unwrap(), Value::Null);
        assert_eq!(coerce(FilterOp::Is, "not.null").unwrap(), Value::NotNull);
        assert!(coerce(FilterOp::Is, "true").is_err());
    }
}
