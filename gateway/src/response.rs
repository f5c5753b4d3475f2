//! PostgREST-shaped response encoding.
//!
//! Reads return bare JSON arrays (or a single object / null under
//! `single` / `maybeSingle`); writes use 201/204 with the affected-row
//! count in `X-Total-Count`.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value as JsonValue;

use restql_core::ast::ReadFlags;

use crate::error::GatewayError;

/// Row-count header set where a count is meaningful.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Structured error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub details: String,
}

/// Encode a read result per the requested response mode.
///
/// `single` requires exactly one row (404 on zero, 400 on more);
/// `maybeSingle` permits zero and renders it as JSON null.
pub fn read_response(rows: Vec<JsonValue>, flags: &ReadFlags) -> Result<Response, GatewayError> {
    if flags.single {
        return match rows.len() {
            0 => Err(GatewayError::no_rows(
                "No rows found",
                "Single row requested but no results",
            )),
            1 => Ok(single(take_first(rows))),
            _ => Err(GatewayError::multiple_rows(
                "Multiple rows found",
                "Single row requested but multiple results returned",
            )),
        };
    }
    if flags.maybe_single {
        return match rows.len() {
            0 => Ok(single(JsonValue::Null)),
            1 => Ok(single(take_first(rows))),
            _ => Err(GatewayError::multiple_rows(
                "Multiple rows found",
                "MaybeSingle row requested but multiple results returned",
            )),
        };
    }
    Ok(array(rows))
}

fn take_first(rows: Vec<JsonValue>) -> JsonValue {
    rows.into_iter().next().unwrap_or(JsonValue::Null)
}

/// 200 with a bare JSON array and the row-count header.
pub fn array(rows: Vec<JsonValue>) -> Response {
    let count = rows.len() as u64;
    with_count((StatusCode::OK, Json(rows)).into_response(), count)
}

fn single(value: JsonValue) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

/// 201 with the echoed input.
pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// 201 with an empty body and the affected-row count.
pub fn created_minimal(count: u64) -> Response {
    with_count(StatusCode::CREATED.into_response(), count)
}

/// 204 with the affected-row count.
pub fn no_content(count: u64) -> Response {
    with_count(StatusCode::NO_CONTENT.into_response(), count)
}

fn with_count(mut response: Response, count: u64) -> Response {
    if let Ok(value) = HeaderValue::from_str(&count.to_string()) {
        response.headers_mut().insert(TOTAL_COUNT_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flags(single: bool, maybe_single: bool) -> ReadFlags {
        ReadFlags {
            single,
            maybe_single,
            ..ReadFlags::default()
        }
    }

    #[test]
    fn test_default_mode_is_array_with_count() {
        let response = read_response(vec![json!({"id": 1}), json!({"id": 2})], &flags(false, false))
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(TOTAL_COUNT_HEADER).unwrap(),
            &HeaderValue::from_static("2")
        );
    }

    #[test]
    fn test_single_cardinality() {
        let ok = read_response(vec![json!({"id": 1})], &flags(true, false)).unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let none = read_response(vec![], &flags(true, false)).unwrap_err();
        assert_eq!(none.status_code(), StatusCode::NOT_FOUND);

        let many =
            read_response(vec![json!({}), json!({})], &flags(true, false)).unwrap_err();
        assert_eq!(many.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_maybe_single_permits_zero() {
        let none = read_response(vec![], &flags(false, true)).unwrap();
        assert_eq!(none.status(), StatusCode::OK);

        let many =
            read_response(vec![json!({}), json!({})], &flags(false, true)).unwrap_err();
        assert_eq!(many.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_write_statuses() {
        assert_eq!(created(json!([{"id": 1}])).status(), StatusCode::CREATED);
        let minimal = created_minimal(3);
        assert_eq!(minimal.status(), StatusCode::CREATED);
        assert_eq!(
            minimal.headers().get(TOTAL_COUNT_HEADER).unwrap(),
            &HeaderValue::from_static("3")
        );
        assert_eq!(no_content(1).status(), StatusCode::NO_CONTENT);
    }
}
