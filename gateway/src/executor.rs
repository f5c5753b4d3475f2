//! Statement execution: parameter binding and row decoding.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Number, Value as JsonValue};
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo};

use restql_core::ast::Value;
use restql_core::plan::SqlQuery;
use restql_core::shape::scalar_from_text;

/// Run a planned read statement and decode every row into labeled JSON
/// values, preserving column order.
pub async fn fetch_rows(
    pool: &MySqlPool,
    planned: &SqlQuery,
) -> Result<Vec<Vec<(String, JsonValue)>>, sqlx::Error> {
    let mut query = sqlx::query(&planned.sql);
    for value in &planned.params {
        query = bind_value(query, value);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows.iter().map(decode_row).collect())
}

/// Run a planned write statement and return the affected-row count.
pub async fn execute(pool: &MySqlPool, planned: &SqlQuery) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&planned.sql);
    for value in &planned.params {
        query = bind_value(query, value);
    }
    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Bind one IR value onto the statement.
fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        // The planner renders `is` without parameters; a stray sentinel
        // binds like NULL.
        Value::NotNull => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(n) => query.bind(*n),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
        // Lists expand to one placeholder per element at plan time; a
        // list reaching a single placeholder binds as its JSON text.
        Value::List(items) => query.bind(serde_json::to_string(items).unwrap_or_default()),
    }
}

fn decode_row(row: &MySqlRow) -> Vec<(String, JsonValue)> {
    row.columns()
        .iter()
        .map(|column| {
            (
                column.name().to_string(),
                decode_column(row, column.ordinal(), column.type_info().name()),
            )
        })
        .collect()
}

/// Decode one column by MySQL type name.
///
/// Typed integers, floats, booleans, JSON and temporal values pass
/// through natively; DECIMAL and text scalars follow the
/// number-else-string rule.
fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> JsonValue {
    match type_name {
        "BOOLEAN" => match row.try_get::<Option<bool>, _>(index) {
            Ok(Some(b)) => JsonValue::Bool(b),
            _ => JsonValue::Null,
        },
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            match row.try_get::<Option<i64>, _>(index) {
                Ok(Some(n)) => JsonValue::Number(n.into()),
                _ => JsonValue::Null,
            }
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => match row.try_get::<Option<u64>, _>(index) {
            Ok(Some(n)) => JsonValue::Number(n.into()),
            _ => JsonValue::Null,
        },
        "FLOAT" | "DOUBLE" => match row.try_get::<Option<f64>, _>(index) {
            Ok(Some(f)) => Number::from_f64(f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            _ => JsonValue::Null,
        },
        "DECIMAL" => match row.try_get::<Option<rust_decimal::Decimal>, _>(index) {
            Ok(Some(d)) => scalar_from_text(d.to_string()),
            _ => JsonValue::Null,
        },
        "JSON" => match row.try_get::<Option<JsonValue>, _>(index) {
            Ok(Some(v)) => v,
            _ => JsonValue::Null,
        },
        "DATE" => match row.try_get::<Option<NaiveDate>, _>(index) {
            Ok(Some(d)) => JsonValue::String(d.to_string()),
            _ => JsonValue::Null,
        },
        "TIME" => match row.try_get::<Option<NaiveTime>, _>(index) {
            Ok(Some(t)) => JsonValue::String(t.to_string()),
            _ => JsonValue::Null,
        },
        "DATETIME" => match row.try_get::<Option<NaiveDateTime>, _>(index) {
            Ok(Some(dt)) => JsonValue::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            _ => JsonValue::Null,
        },
        "TIMESTAMP" => match row.try_get::<Option<DateTime<Utc>>, _>(index) {
            Ok(Some(ts)) => JsonValue::String(ts.to_rfc3339()),
            _ => JsonValue::Null,
        },
        _ => match row.try_get::<Option<String>, _>(index) {
            Ok(Some(text)) => scalar_from_text(text),
            Ok(None) => JsonValue::Null,
            Err(_) => match row.try_get::<Option<Vec<u8>>, _>(index) {
                Ok(Some(bytes)) => scalar_from_text(String::from_utf8_lossy(&bytes).into_owned()),
                _ => {
                    tracing::warn!(type_name, index, "undecodable column; returning null");
                    JsonValue::Null
                }
            },
        },
    }
}
