//! URL-to-IR parsing.
//!
//! The input is the decoded query-string pair list for one request; the
//! output is a [`Query`]. Reserved keys configure projection, ordering,
//! pagination and response modes; every other non-empty pair is a filter.

pub mod filter;
pub mod select;
pub mod value;

use crate::ast::{Direction, NullsPolicy, OrderTerm, Query, Returning};
use crate::error::{QueryError, QueryResult};

/// Query-string keys that are not filters.
pub const RESERVED_KEYS: &[&str] = &[
    "select",
    "order",
    "limit",
    "offset",
    "embed",
    "single",
    "maybeSingle",
    "returning",
    "count",
];

/// Parse one request into the IR.
///
/// `pairs` is the decoded query string in document order. Repeated
/// reserved keys take the first occurrence; repeated filter keys all
/// apply.
pub fn parse_query(table: &str, pairs: &[(String, String)]) -> QueryResult<Query> {
    validate_ident(table)?;
    let mut query = Query::read(table);

    if let Some(expr) = first(pairs, "select") {
        let (columns, embeds) = select::parse_select(expr)?;
        query.select = columns;
        query.embeds = embeds;
    }

    // Legacy embed parameter, unified with the select-embed grammar.
    if let Some(expr) = first(pairs, "embed") {
        for part in split_top_level(expr, ',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            query.embeds.push(select::parse_embed_item(part)?);
        }
    }

    for (key, value) in pairs {
        if RESERVED_KEYS.contains(&key.as_str()) || value.is_empty() {
            continue;
        }
        query.filters.push(filter::parse_filter(key, value)?);
    }

    if let Some(raw) = first(pairs, "order") {
        query.order = parse_order_terms(raw)?;
    }

    if let Some(raw) = first(pairs, "limit") {
        query.limit = Some(parse_uint("limit", raw)?);
    }
    if let Some(raw) = first(pairs, "offset") {
        query.offset = Some(parse_uint("offset", raw)?);
    }

    query.flags.single = first(pairs, "single").map(flag_set).unwrap_or(false);
    query.flags.maybe_single = first(pairs, "maybeSingle").map(flag_set).unwrap_or(false);
    query.flags.returning = match first(pairs, "returning") {
        None | Some("") => Returning::Default,
        Some("minimal") => Returning::Minimal,
        Some("representation") => Returning::Representation,
        Some(other) => {
            return Err(QueryError::Validation(format!(
                "unsupported returning value: '{other}'"
            )))
        }
    };

    Ok(query)
}

fn first<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// A bare `single` / `maybeSingle` key or `=true` enables the flag.
fn flag_set(value: &str) -> bool {
    value.is_empty() || value == "true"
}

fn parse_uint(key: &str, raw: &str) -> QueryResult<u64> {
    raw.parse::<u64>()
        .map_err(|_| QueryError::Validation(format!("invalid {key}: '{raw}'")))
}

/// Parse an `order=` list.
///
/// Terms split on `.`: the first segment is the column; a second segment
/// that is not a direction/nulls keyword is the column part of a
/// `table.column` qualifier; every remaining segment must be `asc`,
/// `desc`, `nullsfirst` or `nullslast`.
fn parse_order_terms(raw: &str) -> QueryResult<Vec<OrderTerm>> {
    let mut terms = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let segments: Vec<&str> = part.split('.').collect();
        let mut rest = 1;
        let mut column = segments[0].to_string();
        if segments.len() > 1 && !is_order_keyword(segments[1]) {
            column = format!("{}.{}", segments[0], segments[1]);
            rest = 2;
        }
        validate_column(&column)?;

        let mut direction = Direction::Asc;
        let mut nulls = None;
        for segment in &segments[rest..] {
            match *segment {
                "asc" => direction = Direction::Asc,
                "desc" => direction = Direction::Desc,
                "nullsfirst" => nulls = Some(NullsPolicy::First),
                "nullslast" => nulls = Some(NullsPolicy::Last),
                _ => return Err(QueryError::InvalidOrder(part.to_string())),
            }
        }
        terms.push(OrderTerm {
            column,
            direction,
            nulls,
        });
    }
    Ok(terms)
}

fn is_order_keyword(segment: &str) -> bool {
    matches!(segment, "asc" | "desc" | "nullsfirst" | "nullslast")
}

/// Split at the given delimiter, ignoring delimiters inside parentheses.
pub(crate) fn split_top_level(input: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;

    for c in input.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            c if c == delimiter && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Validate a bare identifier (table or column name).
///
/// `__` is reserved as the shaping-label delimiter and therefore rejected
/// in user-supplied names.
pub(crate) fn validate_ident(ident: &str) -> QueryResult<()> {
    let mut chars = ident.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !head_ok || !tail_ok || ident.contains("__") {
        return Err(QueryError::InvalidIdentifier(ident.to_string()));
    }
    Ok(())
}

/// Validate a column reference, allowing one `table.column` qualifier.
pub(crate) fn validate_column(column: &str) -> QueryResult<()> {
    match column.split_once('.') {
        Some((table, rest)) => {
            validate_ident(table)?;
            validate_ident(rest)
        }
        None => validate_ident(column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reserved_keys_are_not_filters() {
        let q = parse_query(
            "track",
            &pairs(&[("limit", "5"), ("offset", "2"), ("count", "exact")]),
        )
        .unwrap();
        assert!(q.filters.is_empty());
        assert_eq!(q.limit, Some(5));
        assert_eq!(q.offset, Some(2));
    }

    #[test]
    fn test_filters_collected_in_order() {
        let q = parse_query(
            "users",
            &pairs(&[("age", "gte.18"), ("name", "eq.Alice")]),
        )
        .unwrap();
        assert_eq!(q.filters.len(), 2);
        match &q.filters[0] {
            FilterNode::Condition(f) => {
                assert_eq!(f.column, "age");
                assert_eq!(f.op, FilterOp::Gte);
                assert_eq!(f.value, Value::Int(18));
            }
            other => panic!("expected condition, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_filter_values_skipped() {
        let q = parse_query("users", &pairs(&[("name", "")])).unwrap();
        assert!(q.filters.is_empty());
    }

    #[test]
    fn test_single_flags() {
        let q = parse_query("users", &pairs(&[("single", "")])).unwrap();
        assert!(q.flags.single);
        let q = parse_query("users", &pairs(&[("maybeSingle", "true")])).unwrap();
        assert!(q.flags.maybe_single);
        let q = parse_query("users", &pairs(&[("single", "false")])).unwrap();
        assert!(!q.flags.single);
    }

    #[test]
    fn test_returning_values() {
        let q = parse_query("users", &pairs(&[("returning", "minimal")])).unwrap();
        assert_eq!(q.flags.returning, Returning::Minimal);
        assert!(parse_query("users", &pairs(&[("returning", "all")])).is_err());
    }

    #[test]
    fn test_invalid_limit_rejected() {
        assert!(parse_query("users", &pairs(&[("limit", "ten")])).is_err());
    }

    #[test]
    fn test_order_directions() {
        let q = parse_query(
            "users",
            &pairs(&[("order", "created_at.desc,name")]),
        )
        .unwrap();
        assert_eq!(q.order.len(), 2);
        assert_eq!(q.order[0].direction, Direction::Desc);
        assert_eq!(q.order[1].column, "name");
        assert_eq!(q.order[1].direction, Direction::Asc);
    }

    #[test]
    fn test_order_nulls_and_qualifier() {
        let q = parse_query(
            "track",
            &pairs(&[("order", "album.title.desc.nullslast")]),
        )
        .unwrap();
        assert_eq!(q.order[0].column, "album.title");
        assert_eq!(q.order[0].direction, Direction::Desc);
        assert_eq!(q.order[0].nulls, Some(NullsPolicy::Last));
    }

    #[test]
    fn test_order_two_segments_read_as_qualifier() {
        let q = parse_query("users", &pairs(&[("order", "name.sideways")])).unwrap();
        assert_eq!(q.order[0].column, "name.sideways");
        assert_eq!(q.order[0].direction, Direction::Asc);
    }

    #[test]
    fn test_order_bad_suffix_rejected() {
        assert!(parse_query("users", &pairs(&[("order", "album.title.sideways")])).is_err());
        assert!(parse_query("users", &pairs(&[("order", "name.desc.upsidedown")])).is_err());
    }

    #[test]
    fn test_embed_param_appends() {
        let q = parse_query("users", &pairs(&[("embed", "posts,roles(name)")])).unwrap();
        assert_eq!(q.embeds.len(), 2);
        assert_eq!(q.embeds[0].table, "posts");
        assert_eq!(q.embeds[0].columns, vec!["*"]);
        assert_eq!(q.embeds[1].columns, vec!["name"]);
    }

    #[test]
    fn test_reserved_label_delimiter_rejected() {
        assert!(parse_query("users__x", &[]).is_err());
        assert!(parse_query("users", &pairs(&[("a__b", "eq.1")])).is_err());
    }

    #[test]
    fn test_split_top_level_respects_parens() {
        let parts = split_top_level("a,b(c,d),e", ',');
        assert_eq!(parts, vec!["a", "b(c,d)", "e"]);
    }
}
