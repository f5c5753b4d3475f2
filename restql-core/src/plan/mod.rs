//! SQL planning: one [`Query`] into one parameterized statement.
//!
//! Every column reference in the emitted SQL is alias-qualified, and no
//! user-supplied value is ever concatenated into the statement text;
//! values travel in the ordered parameter list.

pub mod alias;
pub mod rel;

use std::collections::VecDeque;

use regex::Regex;
use serde_json::{Map, Value as JsonValue};

use crate::ast::{Connective, Embed, Filter, FilterNode, FilterOp, NullsPolicy, Query, Value};
use crate::error::{QueryError, QueryResult};
use crate::parser::validate_ident;

use alias::AliasManager;
use rel::RelationResolver;

/// A planned statement: SQL text plus its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Collects bound parameter values in emission order.
#[derive(Debug, Default)]
struct ParamContext {
    params: Vec<Value>,
}

impl ParamContext {
    /// Record a value and return its placeholder.
    fn push(&mut self, value: Value) -> &'static str {
        self.params.push(value);
        "?"
    }
}

pub struct Planner<'a> {
    resolver: &'a (dyn RelationResolver + Send + Sync),
}

impl<'a> Planner<'a> {
    pub fn new(resolver: &'a (dyn RelationResolver + Send + Sync)) -> Self {
        Self { resolver }
    }

    /// Plan the read statement for a query.
    pub fn plan_select(&self, query: &Query) -> QueryResult<SqlQuery> {
        if query.table.is_empty() {
            return Err(QueryError::Validation("table is required".into()));
        }

        let mut aliases = AliasManager::new();
        let main_alias = aliases.get_alias(&query.table);

        // Pre-assign embed aliases breadth-first so the projection can
        // reference every embed table before any join is emitted.
        let mut pending: VecDeque<&Embed> = query.embeds.iter().collect();
        while let Some(embed) = pending.pop_front() {
            aliases.get_alias(&embed.table);
            pending.extend(embed.embeds.iter());
        }

        let has_embeds = !query.embeds.is_empty();

        let mut projection = Vec::new();
        if query.select.is_empty() {
            projection.push(format!("{main_alias}.*"));
        } else {
            for column in &query.select {
                if column == "*" {
                    projection.push(format!("{main_alias}.*"));
                } else if has_embeds {
                    // Stable label encoding so the shaper can rebuild nesting.
                    projection.push(format!(
                        "{main_alias}.{column} AS {}__{column}",
                        query.table
                    ));
                } else {
                    projection.push(format!("{main_alias}.{column}"));
                }
            }
        }
        let mut path = Vec::new();
        for embed in &query.embeds {
            embed_projection(embed, &aliases, &mut path, &mut projection)?;
        }

        let mut sql = format!(
            "SELECT {} FROM {} AS {}",
            projection.join(", "),
            query.table,
            main_alias
        );

        for embed in &query.embeds {
            self.emit_join(&mut sql, embed, &query.table, &aliases)?;
        }

        let mut ctx = ParamContext::default();
        let qualify = |column: &str| qualify_column(column, &query.table, &aliases);

        // Sort top-level filters so identical IRs plan to byte-identical
        // SQL regardless of query-string order.
        let mut top_level: Vec<&FilterNode> = query.filters.iter().collect();
        top_level.sort_by_key(|node| node.sort_key());

        let mut conditions = Vec::new();
        for node in top_level {
            conditions.push(render_node(node, &qualify, &mut ctx)?);
        }
        for embed in &query.embeds {
            embed_conditions(embed, &aliases, &mut ctx, &mut conditions)?;
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !query.order.is_empty() {
            let mut terms = Vec::new();
            for term in &query.order {
                let column = qualify(&term.column);
                // MySQL has no NULLS FIRST/LAST; emulate with an IS NULL
                // ordering prefix.
                match term.nulls {
                    Some(NullsPolicy::First) => terms.push(format!("{column} IS NULL DESC")),
                    Some(NullsPolicy::Last) => terms.push(format!("{column} IS NULL ASC")),
                    None => {}
                }
                terms.push(format!("{column} {}", term.direction.sql()));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        // Zero means absent for both limit and offset.
        let limit = query.limit.filter(|n| *n > 0);
        let offset = query.offset.filter(|n| *n > 0);
        if let Some(n) = limit {
            sql.push_str(" LIMIT ");
            sql.push_str(ctx.push(Value::Int(n as i64)));
        } else if offset.is_some() {
            // MySQL cannot express OFFSET without LIMIT.
            sql.push_str(" LIMIT ");
            sql.push_str(ctx.push(Value::Int(i64::MAX)));
        }
        if let Some(n) = offset {
            sql.push_str(" OFFSET ");
            sql.push_str(ctx.push(Value::Int(n as i64)));
        }

        Ok(SqlQuery {
            sql,
            params: ctx.params,
        })
    }

    /// Plan a multi-row INSERT. Column order is sorted for determinism;
    /// rows missing a column bind NULL.
    pub fn plan_insert(
        &self,
        table: &str,
        rows: &[Map<String, JsonValue>],
    ) -> QueryResult<SqlQuery> {
        build_insert(table, rows, false)
    }

    /// Plan an upsert: INSERT ... ON DUPLICATE KEY UPDATE over the
    /// provided columns.
    pub fn plan_upsert(
        &self,
        table: &str,
        rows: &[Map<String, JsonValue>],
    ) -> QueryResult<SqlQuery> {
        build_insert(table, rows, true)
    }

    /// Plan an UPDATE reusing the shared filter IR for the WHERE clause.
    pub fn plan_update(
        &self,
        table: &str,
        updates: &Map<String, JsonValue>,
        filters: &[FilterNode],
    ) -> QueryResult<SqlQuery> {
        validate_ident(table)?;
        if updates.is_empty() {
            return Err(QueryError::Validation("no columns to update".into()));
        }
        if filters.is_empty() {
            return Err(QueryError::Validation(
                "update requires at least one filter".into(),
            ));
        }

        let mut ctx = ParamContext::default();

        let mut pairs: Vec<(&String, &JsonValue)> = updates.iter().collect();
        pairs.sort_by_key(|(column, _)| *column);
        let mut sets = Vec::with_capacity(pairs.len());
        for (column, value) in pairs {
            validate_ident(column)?;
            sets.push(format!("{column} = {}", ctx.push(Value::from_json(value))));
        }

        let qualify = |column: &str| column.to_string();
        let mut nodes: Vec<&FilterNode> = filters.iter().collect();
        nodes.sort_by_key(|node| node.sort_key());
        let mut conditions = Vec::with_capacity(nodes.len());
        for node in nodes {
            conditions.push(render_node(node, &qualify, &mut ctx)?);
        }

        Ok(SqlQuery {
            sql: format!(
                "UPDATE {table} SET {} WHERE {}",
                sets.join(", "),
                conditions.join(" AND ")
            ),
            params: ctx.params,
        })
    }

    fn emit_join(
        &self,
        sql: &mut String,
        embed: &Embed,
        parent: &str,
        aliases: &AliasManager,
    ) -> QueryResult<()> {
        let embed_alias = aliases
            .get(&embed.table)
            .ok_or_else(|| QueryError::Validation(format!("no alias for table {}", embed.table)))?;

        let on = match &embed.on_condition {
            Some(condition) => condition.clone(),
            None => self.resolver.resolve(parent, &embed.table)?,
        };
        let on = rewrite_to_aliases(&on, aliases);

        sql.push_str(&format!(
            " {} {} AS {} ON {}",
            embed.join.sql(),
            embed.table,
            embed_alias,
            on
        ));

        for nested in &embed.embeds {
            self.emit_join(sql, nested, &embed.table, aliases)?;
        }
        Ok(())
    }
}

/// Emit the labeled projection entries for an embed subtree.
fn embed_projection(
    embed: &Embed,
    aliases: &AliasManager,
    path: &mut Vec<String>,
    out: &mut Vec<String>,
) -> QueryResult<()> {
    let embed_alias = aliases
        .get(&embed.table)
        .ok_or_else(|| QueryError::Validation(format!("no alias for table {}", embed.table)))?;
    path.push(embed.table.clone());

    for column in &embed.columns {
        if column == "*" {
            // Raw labels: shaping for this embed is best-effort.
            out.push(format!("{embed_alias}.*"));
        } else {
            out.push(format!(
                "{embed_alias}.{column} AS {}__{column}",
                path.join("__")
            ));
        }
    }
    for nested in &embed.embeds {
        embed_projection(nested, aliases, path, out)?;
    }

    path.pop();
    Ok(())
}

/// Render the filters attached to an embed, qualified by its alias.
fn embed_conditions(
    embed: &Embed,
    aliases: &AliasManager,
    ctx: &mut ParamContext,
    out: &mut Vec<String>,
) -> QueryResult<()> {
    if !embed.filters.is_empty() {
        let embed_alias = aliases
            .get(&embed.table)
            .ok_or_else(|| QueryError::Validation(format!("no alias for table {}", embed.table)))?;
        for filter in &embed.filters {
            let column = match filter.column.split_once('.') {
                Some((table, rest)) => match aliases.get(table) {
                    Some(found) => format!("{found}.{rest}"),
                    None => filter.column.clone(),
                },
                None => format!("{embed_alias}.{}", filter.column),
            };
            out.push(render_condition(&column, filter, ctx)?);
        }
    }
    for nested in &embed.embeds {
        embed_conditions(nested, aliases, ctx, out)?;
    }
    Ok(())
}

fn render_node(
    node: &FilterNode,
    qualify: &dyn Fn(&str) -> String,
    ctx: &mut ParamContext,
) -> QueryResult<String> {
    match node {
        FilterNode::Condition(filter) => {
            let column = qualify(&filter.column);
            render_condition(&column, filter, ctx)
        }
        FilterNode::Group(group) => {
            let mut parts = Vec::with_capacity(group.children.len());
            for child in &group.children {
                parts.push(render_node(child, qualify, ctx)?);
            }
            let joiner = match group.connective {
                Connective::And => " AND ",
                Connective::Or => " OR ",
            };
            Ok(format!("({})", parts.join(joiner)))
        }
    }
}

fn render_condition(column: &str, filter: &Filter, ctx: &mut ParamContext) -> QueryResult<String> {
    match filter.op {
        FilterOp::Eq => Ok(format!("{column} = {}", bind(ctx, filter)?)),
        FilterOp::Neq => Ok(format!("{column} <> {}", bind(ctx, filter)?)),
        FilterOp::Gt => Ok(format!("{column} > {}", bind(ctx, filter)?)),
        FilterOp::Gte => Ok(format!("{column} >= {}", bind(ctx, filter)?)),
        FilterOp::Lt => Ok(format!("{column} < {}", bind(ctx, filter)?)),
        FilterOp::Lte => Ok(format!("{column} <= {}", bind(ctx, filter)?)),
        FilterOp::Like => Ok(format!("{column} LIKE {}", bind(ctx, filter)?)),
        FilterOp::Ilike => Ok(format!("LOWER({column}) LIKE LOWER({})", bind(ctx, filter)?)),
        FilterOp::In => match &filter.value {
            // Empty IN list can match nothing; plan the false constant.
            Value::List(items) if items.is_empty() => Ok("1 = 0".to_string()),
            Value::List(items) => {
                let placeholders: Vec<&str> =
                    items.iter().map(|item| ctx.push(item.clone())).collect();
                Ok(format!("{column} IN ({})", placeholders.join(", ")))
            }
            _ => Err(QueryError::Validation(format!(
                "in filter on '{}' requires a list",
                filter.column
            ))),
        },
        FilterOp::Is => match &filter.value {
            Value::Null => Ok(format!("{column} IS NULL")),
            Value::NotNull => Ok(format!("{column} IS NOT NULL")),
            _ => Err(QueryError::Validation(format!(
                "is filter on '{}' requires null or not.null",
                filter.column
            ))),
        },
    }
}

fn bind(ctx: &mut ParamContext, filter: &Filter) -> QueryResult<&'static str> {
    match &filter.value {
        Value::List(_) | Value::NotNull => Err(QueryError::Validation(format!(
            "scalar value required for filter on '{}'",
            filter.column
        ))),
        scalar => Ok(ctx.push(scalar.clone())),
    }
}

/// Qualify a filter or order column.
///
/// `table.column` rewrites to `alias.column` when the table is known to
/// the alias manager and is otherwise left as-is; unqualified columns
/// take the main-table alias.
fn qualify_column(column: &str, main_table: &str, aliases: &AliasManager) -> String {
    if let Some((table, rest)) = column.split_once('.') {
        return match aliases.get(table) {
            Some(found) => format!("{found}.{rest}"),
            None => column.to_string(),
        };
    }
    match aliases.get(main_table) {
        Some(found) => format!("{found}.{column}"),
        None => column.to_string(),
    }
}

/// Rewrite `<table>.` prefixes in a join predicate to `<alias>.` using
/// word-boundary substitution.
fn rewrite_to_aliases(condition: &str, aliases: &AliasManager) -> String {
    let mut rewritten = condition.to_string();
    for (table, table_alias) in aliases.mappings() {
        if let Ok(pattern) = Regex::new(&format!(r"\b{}\.", regex::escape(table))) {
            rewritten = pattern
                .replace_all(&rewritten, format!("{table_alias}."))
                .into_owned();
        }
    }
    rewritten
}

fn build_insert(
    table: &str,
    rows: &[Map<String, JsonValue>],
    upsert: bool,
) -> QueryResult<SqlQuery> {
    validate_ident(table)?;
    if rows.is_empty() {
        return Err(QueryError::Validation("no rows to insert".into()));
    }

    let mut columns: Vec<&String> = rows[0].keys().collect();
    columns.sort();
    if columns.is_empty() {
        return Err(QueryError::Validation("no columns to insert".into()));
    }
    for column in &columns {
        validate_ident(column)?;
    }

    let mut ctx = ParamContext::default();
    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        let mut placeholders = Vec::with_capacity(columns.len());
        for column in &columns {
            let value = row
                .get(*column)
                .map(Value::from_json)
                .unwrap_or(Value::Null);
            placeholders.push(ctx.push(value));
        }
        tuples.push(format!("({})", placeholders.join(", ")));
    }

    let column_list: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES {}",
        column_list.join(", "),
        tuples.join(", ")
    );
    if upsert {
        let updates: Vec<String> = column_list
            .iter()
            .map(|c| format!("{c} = VALUES({c})"))
            .collect();
        sql.push_str(" ON DUPLICATE KEY UPDATE ");
        sql.push_str(&updates.join(", "));
    }

    Ok(SqlQuery {
        sql,
        params: ctx.params,
    })
}
