//! Schema introspection over `information_schema`.
//!
//! Powers two consumers: the `inspect` CLI command (table summaries as
//! JSON) and the [`SchemaCache`] relationship resolver, which checks
//! foreign-key candidates against real columns instead of guessing.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use sqlx::mysql::MySqlPool;
use sqlx::Row;

use restql_core::error::{QueryError, QueryResult};
use restql_core::plan::rel::{candidate_keys, RelationResolver};

#[derive(Debug, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
}

#[derive(Debug, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    pub default: String,
    pub comment: String,
    #[serde(rename = "primaryKey")]
    pub primary_key: bool,
    #[serde(rename = "foreignKey")]
    pub foreign_key: bool,
    #[serde(rename = "uniqueKey")]
    pub unique_key: bool,
    #[serde(rename = "autoIncrement")]
    pub auto_increment: bool,
}

#[derive(Debug, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Load table summaries. An empty `tables` list loads every base table
/// of the connected database.
pub async fn inspect_tables(
    pool: &MySqlPool,
    tables: &[String],
) -> Result<Vec<TableInfo>, sqlx::Error> {
    let names = if tables.is_empty() {
        all_tables(pool).await?
    } else {
        tables.to_vec()
    };

    let mut result = Vec::with_capacity(names.len());
    for name in names {
        let columns = table_columns(pool, &name).await?;
        let indexes = table_indexes(pool, &name).await?;
        result.push(TableInfo {
            name,
            columns,
            indexes,
        });
    }
    Ok(result)
}

async fn all_tables(pool: &MySqlPool) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
         ORDER BY TABLE_NAME",
    )
    .fetch_all(pool)
    .await?;
    rows.iter().map(|row| row.try_get::<String, _>(0)).collect()
}

async fn table_columns(pool: &MySqlPool, table: &str) -> Result<Vec<ColumnInfo>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_DEFAULT, \
                COLUMN_COMMENT, COLUMN_KEY, EXTRA \
         FROM INFORMATION_SCHEMA.COLUMNS \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
         ORDER BY ORDINAL_POSITION",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let nullable: String = row.try_get(2)?;
        let default: Option<String> = row.try_get(3)?;
        let key: String = row.try_get(5)?;
        let extra: String = row.try_get(6)?;
        columns.push(ColumnInfo {
            name: row.try_get(0)?,
            column_type: row.try_get(1)?,
            nullable: nullable == "YES",
            default: default.unwrap_or_default(),
            comment: row.try_get(4)?,
            primary_key: key == "PRI",
            foreign_key: key == "MUL",
            unique_key: key == "UNI",
            auto_increment: extra.contains("auto_increment"),
        });
    }
    Ok(columns)
}

async fn table_indexes(pool: &MySqlPool, table: &str) -> Result<Vec<IndexInfo>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE \
         FROM INFORMATION_SCHEMA.STATISTICS \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
         ORDER BY INDEX_NAME, SEQ_IN_INDEX",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    let mut grouped: BTreeMap<String, IndexInfo> = BTreeMap::new();
    for row in &rows {
        let name: String = row.try_get(0)?;
        // The primary key is already reported on the columns.
        if name == "PRIMARY" {
            continue;
        }
        let column: String = row.try_get(1)?;
        let non_unique: i64 = row.try_get(2)?;
        grouped
            .entry(name.clone())
            .or_insert_with(|| IndexInfo {
                name,
                columns: Vec::new(),
                unique: non_unique == 0,
            })
            .columns
            .push(column);
    }
    Ok(grouped.into_values().collect())
}

/// Column cache backing the schema-aware relationship resolver.
#[derive(Debug, Default)]
pub struct SchemaCache {
    columns: HashMap<String, HashSet<String>>,
}

impl SchemaCache {
    /// Introspect every column of the connected database.
    pub async fn load(pool: &MySqlPool) -> Result<Self, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT TABLE_NAME, COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE()",
        )
        .fetch_all(pool)
        .await?;

        let mut columns: HashMap<String, HashSet<String>> = HashMap::new();
        for row in &rows {
            let table: String = row.try_get(0)?;
            let column: String = row.try_get(1)?;
            columns.entry(table).or_default().insert(column);
        }
        Ok(Self { columns })
    }

    /// Build a cache from known `(table, column)` pairs.
    pub fn from_columns(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut columns: HashMap<String, HashSet<String>> = HashMap::new();
        for (table, column) in pairs {
            columns.entry(table).or_default().insert(column);
        }
        Self { columns }
    }

    pub fn table_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.columns.contains_key(table)
    }

    pub fn column_exists(&self, table: &str, column: &str) -> bool {
        self.columns
            .get(table)
            .map(|cols| cols.contains(column))
            .unwrap_or(false)
    }
}

impl RelationResolver for SchemaCache {
    /// Probe the candidate foreign-key columns on the child table; the
    /// failure names every attempted candidate.
    fn resolve(&self, parent: &str, child: &str) -> QueryResult<String> {
        let candidates = candidate_keys(parent);
        for key in &candidates {
            if self.column_exists(child, key) {
                return Ok(format!("{parent}.id = {child}.{key}"));
            }
        }
        Err(QueryError::Relationship {
            parent: parent.to_string(),
            child: child.to_string(),
            candidates: candidates.join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> SchemaCache {
        SchemaCache::from_columns([
            ("users".to_string(), "id".to_string()),
            ("posts".to_string(), "id".to_string()),
            ("posts".to_string(), "users_id".to_string()),
            ("profiles".to_string(), "usersId".to_string()),
            ("tags".to_string(), "id".to_string()),
        ])
    }

    #[test]
    fn test_resolver_prefers_parent_id() {
        let on = cache().resolve("users", "posts").unwrap();
        assert_eq!(on, "users.id = posts.users_id");
    }

    #[test]
    fn test_resolver_falls_back_through_candidates() {
        let on = cache().resolve("users", "profiles").unwrap();
        assert_eq!(on, "users.id = profiles.usersId");

        let on = cache().resolve("users", "tags").unwrap();
        assert_eq!(on, "users.id = tags.id");
    }

    #[test]
    fn test_resolver_failure_names_candidates() {
        let err = cache().resolve("users", "missing").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("users_id"));
        assert!(message.contains("usersId"));
        assert!(message.contains("'missing'"));
    }

    #[test]
    fn test_column_lookup() {
        let cache = cache();
        assert!(cache.has_table("users"));
        assert!(cache.column_exists("posts", "users_id"));
        assert!(!cache.column_exists("posts", "ghost"));
        assert_eq!(cache.table_count(), 4);
    }
}
