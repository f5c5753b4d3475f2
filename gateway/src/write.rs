//! Write-path request handling: insert, upsert and update.
//!
//! The write path reuses the shared filter IR for WHERE clauses and the
//! response conventions of the read path.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::{Map, Value as JsonValue};

use restql_core::ast::{Query, Returning};
use restql_core::parse_query;
use restql_core::plan::Planner;
use restql_core::shape::Shaper;

use crate::error::GatewayError;
use crate::executor;
use crate::handler::query_pairs;
use crate::response;
use crate::server::GatewayState;

/// POST /{table}: insert rows; `Prefer: resolution=merge-duplicates`
/// flips the operation to an upsert.
pub async fn insert_handler(
    State(state): State<Arc<GatewayState>>,
    Path(table): Path<String>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let payload: JsonValue = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::validation("Invalid JSON in request body", e.to_string()))?;
    let rows = collect_rows(payload)?;
    if rows.is_empty() || rows.iter().all(|row| row.is_empty()) {
        return Err(GatewayError::validation(
            "No data provided",
            "Request body must contain data to insert",
        ));
    }

    let pairs = query_pairs(raw.as_deref());
    let query = parse_query(&table, &pairs)?;
    let upsert = wants_merge_duplicates(&headers);

    // Returning the written rows needs primary-key knowledge the server
    // does not have; decline rather than approximate.
    if query.flags.returning == Returning::Representation {
        let operation = if upsert { "upsert" } else { "insert" };
        return Err(GatewayError::validation(
            "Unsupported returning parameter",
            format!("returning=representation is not supported for {operation} operations"),
        ));
    }

    let planner = Planner::new(state.resolver.as_ref());
    let planned = if upsert {
        planner.plan_upsert(&table, &rows)?
    } else {
        planner.plan_insert(&table, &rows)?
    };
    let affected = executor::execute(&state.pool, &planned).await?;
    tracing::info!(table = %table, rows = affected, upsert, "write complete");

    match query.flags.returning {
        Returning::Minimal => Ok(response::created_minimal(affected)),
        _ => Ok(response::created(rows)),
    }
}

/// PATCH /{table}: update rows matching the request filters.
///
/// The body must be a single JSON object, and at least one filter is
/// required so a request cannot update a whole table by accident.
pub async fn update_handler(
    State(state): State<Arc<GatewayState>>,
    Path(table): Path<String>,
    RawQuery(raw): RawQuery,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let payload: JsonValue = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::validation("Invalid JSON in request body", e.to_string()))?;
    let updates = match payload {
        JsonValue::Object(map) => map,
        JsonValue::Array(_) => {
            return Err(GatewayError::validation(
                "Invalid data format",
                "PATCH requests must contain a single object, not an array",
            ))
        }
        _ => {
            return Err(GatewayError::validation(
                "Invalid data format",
                "Expected object for PATCH request",
            ))
        }
    };
    if updates.is_empty() {
        return Err(GatewayError::validation(
            "No data provided",
            "Request body must contain data to update",
        ));
    }

    let pairs = query_pairs(raw.as_deref());
    let query = parse_query(&table, &pairs)?;
    if query.filters.is_empty() {
        return Err(GatewayError::validation(
            "Filters required",
            "PATCH requests must include at least one filter to prevent accidental full-table updates",
        ));
    }

    let planner = Planner::new(state.resolver.as_ref());
    let planned = planner.plan_update(&table, &updates, &query.filters)?;
    let affected = executor::execute(&state.pool, &planned).await?;
    tracing::info!(table = %table, rows = affected, "update complete");

    if affected == 0 {
        return Err(GatewayError::no_rows(
            "No rows matched the filter criteria",
            "No records were updated",
        ));
    }

    match query.flags.returning {
        Returning::Representation => {
            // Re-select the affected rows with the same filters.
            let mut reselect = Query::read(table.as_str());
            reselect.filters = query.filters.clone();
            let planned = planner.plan_select(&reselect)?;
            let rows = executor::fetch_rows(&state.pool, &planned).await?;
            let shaper = Shaper::new(table.as_str(), false);
            let shaped: Vec<JsonValue> = rows.iter().map(|row| shaper.shape_row(row)).collect();
            Ok(response::array(shaped))
        }
        _ => Ok(response::no_content(affected)),
    }
}

/// Split an insert body into rows: one for an object, many for an array.
fn collect_rows(payload: JsonValue) -> Result<Vec<Map<String, JsonValue>>, GatewayError> {
    match payload {
        JsonValue::Object(map) => Ok(vec![map]),
        JsonValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                JsonValue::Object(map) => Ok(map),
                _ => Err(GatewayError::validation(
                    "Invalid data format",
                    "Array elements must be objects",
                )),
            })
            .collect(),
        _ => Err(GatewayError::validation(
            "Invalid data format",
            "Expected object or array of objects",
        )),
    }
}

fn wants_merge_duplicates(headers: &HeaderMap) -> bool {
    headers
        .get("prefer")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("resolution=merge-duplicates"))
        .unwrap_or(false)
}
