//! # restql gateway
//!
//! HTTP front end for the query translation core. Routes table requests
//! by method, executes the planned statements over a shared MySQL pool,
//! and emits PostgREST-shaped responses.
//!
//! ```text
//! Client → axum router → parse → plan → sqlx pool → shape → JSON
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use restql_gateway::{Gateway, GatewayConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GatewayConfig::load("config.yaml")?;
//!     let mut gateway = Gateway::new(config);
//!     gateway.init().await?;
//!     gateway.serve().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod handler;
pub mod response;
pub mod router;
pub mod schema;
pub mod server;
pub mod write;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use server::{Gateway, GatewayState};
