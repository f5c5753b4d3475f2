//! Join predicate synthesis.
//!
//! The planner asks a [`RelationResolver`] for the `parent/child`
//! predicate when an embed carries no explicit ON condition. The
//! convention resolver guesses by naming convention; a schema-backed
//! resolver (in the gateway) checks the candidate columns against real
//! tables and fails with the attempted candidates when none exists.

use crate::error::QueryResult;

/// Foreign-key column candidates on the child table, in probe order.
pub fn candidate_keys(parent: &str) -> [String; 3] {
    [
        format!("{parent}_id"),
        format!("{parent}Id"),
        "id".to_string(),
    ]
}

/// Produces a join predicate in `parent.col = child.col` form.
pub trait RelationResolver {
    fn resolve(&self, parent: &str, child: &str) -> QueryResult<String>;
}

/// Convention-only resolver used when no schema oracle is available.
/// Falls back to the first candidate, `<parent>_id`.
#[derive(Debug, Default)]
pub struct ConventionResolver;

impl RelationResolver for ConventionResolver {
    fn resolve(&self, parent: &str, child: &str) -> QueryResult<String> {
        Ok(format!("{parent}.id = {child}.{parent}_id"))
    }
}
