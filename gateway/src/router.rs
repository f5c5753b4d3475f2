//! HTTP router assembly.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{api_info, health_handler, method_not_allowed, select_handler};
use crate::server::GatewayState;
use crate::write::{insert_handler, update_handler};

/// Build the gateway router with CORS, tracing and the per-request
/// deadline.
pub fn create_router(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let timeout = TimeoutLayer::new(state.config.request_timeout());

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health_handler))
        .route(
            "/:table",
            get(select_handler)
                .post(insert_handler)
                .patch(update_handler)
                .fallback(method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(cors)
        .with_state(state)
}
