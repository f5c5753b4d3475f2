//! Gateway error types and their HTTP mapping.
//!
//! Every failure renders as `{"error", "code", "details"}` where `code`
//! is a short token derived from the HTTP status. Driver messages go
//! into `details`; SQL text and bound values never do.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use restql_core::error::QueryError;

use crate::response::ErrorBody;

/// Main error type for the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Query translation failure (parse, plan or relationship synthesis).
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Request-level validation failure.
    #[error("{message}")]
    Validation { message: String, details: String },

    /// Zero rows where at least one was required.
    #[error("{message}")]
    NoRows { message: String, details: String },

    /// More than one row where at most one was allowed.
    #[error("{message}")]
    MultipleRows { message: String, details: String },

    /// HTTP method without a handler.
    #[error("method not allowed: {method}")]
    MethodNotAllowed { method: String },

    /// Database execution failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn no_rows(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::NoRows {
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn multiple_rows(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::MultipleRows {
            message: message.into(),
            details: details.into(),
        }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Query(_) => StatusCode::BAD_REQUEST,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NoRows { .. } => StatusCode::NOT_FOUND,
            Self::MultipleRows { .. } => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short stable token derived from the HTTP status.
    pub fn code(&self) -> String {
        format!("RQL{}", self.status_code().as_u16())
    }

    fn body(&self) -> ErrorBody {
        let (error, details) = match self {
            Self::Config(message) => ("Configuration error".to_string(), message.clone()),
            Self::Query(e) => (e.to_string(), String::new()),
            Self::Validation { message, details } => (message.clone(), details.clone()),
            Self::NoRows { message, details } => (message.clone(), details.clone()),
            Self::MultipleRows { message, details } => (message.clone(), details.clone()),
            Self::MethodNotAllowed { method } => (
                "Method not allowed".to_string(),
                format!("Method {method} not supported"),
            ),
            Self::Database(e) => ("Database operation failed".to_string(), e.to_string()),
            Self::Internal(e) => ("Internal error".to_string(), e.to_string()),
        };
        ErrorBody {
            error,
            code: self.code(),
            details,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let parse = GatewayError::Query(QueryError::InvalidOperator("around".into()));
        assert_eq!(parse.status_code(), StatusCode::BAD_REQUEST);

        let missing = GatewayError::no_rows("No rows found", "");
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let many = GatewayError::multiple_rows("Multiple rows found", "");
        assert_eq!(many.status_code(), StatusCode::BAD_REQUEST);

        let method = GatewayError::MethodNotAllowed {
            method: "DELETE".into(),
        };
        assert_eq!(method.status_code(), StatusCode::METHOD_NOT_ALLOWED);

        let config = GatewayError::Config("missing".into());
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_code_token_derives_from_status() {
        let err = GatewayError::validation("Filters required", "");
        assert_eq!(err.code(), "RQL400");
        let err = GatewayError::no_rows("No rows found", "");
        assert_eq!(err.code(), "RQL404");
    }

    #[test]
    fn test_relationship_error_is_client_error() {
        let err = GatewayError::Query(QueryError::Relationship {
            parent: "users".into(),
            child: "posts".into(),
            candidates: "users_id, usersId, id".into(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("users_id"));
    }
}
