//! Intermediate representation for translated requests.
//!
//! The parser produces a [`Query`] per request; the planner consumes it.
//! IR values are never shared across requests.

use serde::{Deserialize, Serialize};

/// A scalar or list value carried by a filter.
///
/// `NotNull` is the sentinel produced by `is.not.null`; it never binds a
/// parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    NotNull,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Convert a JSON body value into an IR value for parameter binding.
    ///
    /// Arrays and objects bind as their JSON text; MySQL accepts that for
    /// JSON columns and it round-trips for everything else.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Comparison operators accepted in filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    In,
    Is,
}

impl FilterOp {
    /// Look up an operator token from the allowlist.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(FilterOp::Eq),
            "neq" => Some(FilterOp::Neq),
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "like" => Some(FilterOp::Like),
            "ilike" => Some(FilterOp::Ilike),
            "in" => Some(FilterOp::In),
            "is" => Some(FilterOp::Is),
            _ => None,
        }
    }
}

/// A single `(column, operator, value)` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Connective of a logical filter group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connective {
    And,
    Or,
}

/// A logical combination of filters, nested to arbitrary depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalFilter {
    pub connective: Connective,
    pub children: Vec<FilterNode>,
}

/// A WHERE-clause node: either a simple condition or a logical group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
    Condition(Filter),
    Group(LogicalFilter),
}

impl FilterNode {
    /// Stable key used to sort top-level filters before SQL emission so
    /// that identical IRs plan to byte-identical SQL regardless of
    /// query-string order. Groups sort after plain columns (`~` follows
    /// every identifier character in ASCII).
    pub fn sort_key(&self) -> String {
        match self {
            FilterNode::Condition(f) => f.column.clone(),
            FilterNode::Group(g) => {
                let conn = match g.connective {
                    Connective::And => "and",
                    Connective::Or => "or",
                };
                let children: Vec<String> =
                    g.children.iter().map(|c| c.sort_key()).collect();
                format!("~{}({})", conn, children.join(","))
            }
        }
    }
}

/// Join flavor of an embedded table. PostgREST defaults to left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    #[default]
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "inner" => Some(JoinKind::Inner),
            "left" => Some(JoinKind::Left),
            "right" => Some(JoinKind::Right),
            "full" => Some(JoinKind::Full),
            _ => None,
        }
    }

    /// SQL join keyword.
    pub fn sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

/// A requested related table, joined and nested under a key named for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub table: String,
    /// Selected columns; `["*"]` selects everything (degrades shaping).
    pub columns: Vec<String>,
    pub join: JoinKind,
    /// Join predicate in `parent.col = child.col` form. Synthesized by
    /// the relationship resolver when absent; rewritten to aliases at
    /// plan time.
    pub on_condition: Option<String>,
    /// Filters applied against the embedded table.
    pub filters: Vec<Filter>,
    pub embeds: Vec<Embed>,
}

impl Embed {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec!["*".to_string()],
            join: JoinKind::default(),
            on_condition: None,
            filters: vec![],
            embeds: vec![],
        }
    }
}

/// Sort direction of an order term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Null placement of an order term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullsPolicy {
    First,
    Last,
}

/// One `order=` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTerm {
    pub column: String,
    pub direction: Direction,
    pub nulls: Option<NullsPolicy>,
}

/// Response-body control for write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Returning {
    #[default]
    Default,
    Minimal,
    Representation,
}

/// Per-request response-mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadFlags {
    pub single: bool,
    pub maybe_single: bool,
    pub returning: Returning,
}

/// A fully parsed request against one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub table: String,
    /// Requested main-table columns; empty means `*`.
    pub select: Vec<String>,
    pub filters: Vec<FilterNode>,
    pub order: Vec<OrderTerm>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub embeds: Vec<Embed>,
    pub flags: ReadFlags,
}

impl Query {
    /// Create an empty query against the given table.
    pub fn read(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: vec![],
            filters: vec![],
            order: vec![],
            limit: None,
            offset: None,
            embeds: vec![],
            flags: ReadFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_json() {
        assert_eq!(Value::from_json(&serde_json::json!(42)), Value::Int(42));
        assert_eq!(Value::from_json(&serde_json::json!(2.5)), Value::Float(2.5));
        assert_eq!(
            Value::from_json(&serde_json::json!("x")),
            Value::String("x".into())
        );
        assert_eq!(Value::from_json(&serde_json::Value::Null), Value::Null);
        assert_eq!(
            Value::from_json(&serde_json::json!([1, 2])),
            Value::String("[1,2]".into())
        );
    }

    #[test]
    fn test_operator_allowlist() {
        assert_eq!(FilterOp::from_token("gte"), Some(FilterOp::Gte));
        assert_eq!(FilterOp::from_token("contains"), None);
    }

    #[test]
    fn test_sort_key_groups_after_columns() {
        let cond = FilterNode::Condition(Filter {
            column: "zzz".into(),
            op: FilterOp::Eq,
            value: Value::Int(1),
        });
        let group = FilterNode::Group(LogicalFilter {
            connective: Connective::Or,
            children: vec![cond.clone()],
        });
        assert!(cond.sort_key() < group.sort_key());
    }
}
