//! Error types for query translation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Operator token not in the allowlist.
    #[error("invalid operator: '{0}'")]
    InvalidOperator(String),

    /// The `is` operator accepts only `null` and `not.null`.
    #[error("invalid is value: '{0}'")]
    InvalidIsValue(String),

    /// Identifier failed validation (bad characters or reserved `__`).
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// A filter parameter could not be parsed.
    #[error("failed to parse filter '{key}': {message}")]
    Filter { key: String, message: String },

    /// A `select=` item could not be parsed.
    #[error("invalid select item '{item}': {message}")]
    Select { item: String, message: String },

    /// An `order=` term could not be parsed.
    #[error("invalid order term: '{0}'")]
    InvalidOrder(String),

    /// No join predicate could be synthesized for a parent/child pair.
    #[error("no relationship between '{parent}' and '{child}': tried {candidates}")]
    Relationship {
        parent: String,
        child: String,
        candidates: String,
    },

    /// Request-level validation failure (bad limit, bad returning, ...).
    #[error("validation error: {0}")]
    Validation(String),
}

impl QueryError {
    /// Create a filter parse error for the given query-string key.
    pub fn filter(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Filter {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a select parse error for the given item.
    pub fn select(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Select {
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for query translation.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::filter("age", "invalid operator: 'gte2'");
        assert_eq!(
            err.to_string(),
            "failed to parse filter 'age': invalid operator: 'gte2'"
        );
    }

    #[test]
    fn test_relationship_display() {
        let err = QueryError::Relationship {
            parent: "users".into(),
            child: "posts".into(),
            candidates: "users_id, usersId, id".into(),
        };
        assert!(err.to_string().contains("users_id, usersId, id"));
    }
}
