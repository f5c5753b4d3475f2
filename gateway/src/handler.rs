//! Read-path request handling.

use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::http::Method;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use serde_json::Value as JsonValue;

use restql_core::parse_query;
use restql_core::plan::Planner;
use restql_core::shape::Shaper;

use crate::error::GatewayError;
use crate::executor;
use crate::response;
use crate::server::GatewayState;

/// Decode a raw query string into ordered pairs.
pub(crate) fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw.unwrap_or("").as_bytes())
        .into_owned()
        .collect()
}

/// GET /{table}: the read pipeline. Parse, plan, execute, shape.
pub async fn select_handler(
    State(state): State<Arc<GatewayState>>,
    Path(table): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Response, GatewayError> {
    let pairs = query_pairs(raw.as_deref());
    let query = parse_query(&table, &pairs)?;

    let planner = Planner::new(state.resolver.as_ref());
    let planned = planner.plan_select(&query)?;
    tracing::debug!(table = %table, sql = %planned.sql, "planned select");

    let rows = executor::fetch_rows(&state.pool, &planned).await?;

    let shaper = Shaper::new(query.table.as_str(), !query.embeds.is_empty());
    let shaped: Vec<JsonValue> = rows.iter().map(|row| shaper.shape_row(row)).collect();
    tracing::debug!(table = %table, rows = shaped.len(), "select complete");

    response::read_response(shaped, &query.flags)
}

/// Fallback for unrouted methods on /{table} (DELETE is reserved).
pub async fn method_not_allowed(method: Method) -> GatewayError {
    GatewayError::MethodNotAllowed {
        method: method.to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pool_size: u32,
    pub pool_idle: usize,
}

pub async fn health_handler(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pool_size: state.pool.size(),
        pool_idle: state.pool.num_idle(),
    })
}

/// GET /: API summary.
pub async fn api_info() -> Json<JsonValue> {
    Json(serde_json::json!({
        "name": "restql",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET": "Select rows from a table",
            "POST": "Insert rows into a table",
            "PATCH": "Update rows in a table",
        },
        "usage": {
            "select": "GET /{table}?select=col1,col2&col=eq.value",
            "insert": "POST /{table} with JSON body",
            "update": "PATCH /{table}?col=eq.value with JSON body",
        },
        "operators": ["eq", "neq", "gt", "gte", "lt", "lte", "like", "ilike", "in", "is"],
        "logical_operators": ["and", "or"],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_preserve_order_and_decode() {
        let pairs = query_pairs(Some("name=eq.AC%2FDC&limit=5&single"));
        assert_eq!(
            pairs,
            vec![
                ("name".to_string(), "eq.AC/DC".to_string()),
                ("limit".to_string(), "5".to_string()),
                ("single".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_query_pairs_empty() {
        assert!(query_pairs(None).is_empty());
        assert!(query_pairs(Some("")).is_empty());
    }
}
