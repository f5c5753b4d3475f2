//! Gateway server: shared state, pool initialization, serve loop.

use std::sync::Arc;

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tokio::net::TcpListener;

use restql_core::plan::rel::{ConventionResolver, RelationResolver};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::router::create_router;
use crate::schema::SchemaCache;

/// State shared by every request handler.
pub struct GatewayState {
    pub pool: MySqlPool,
    pub resolver: Arc<dyn RelationResolver + Send + Sync>,
    pub config: GatewayConfig,
}

/// The restql gateway server.
pub struct Gateway {
    config: GatewayConfig,
    state: Option<Arc<GatewayState>>,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Connect the pool and load the schema cache.
    pub async fn init(&mut self) -> Result<(), GatewayError> {
        let (name, service) = self
            .config
            .first_service()
            .ok_or_else(|| GatewayError::Config("no services configured".to_string()))?;

        tracing::info!(service = %name, "connecting to database");
        let pool = MySqlPoolOptions::new()
            .max_connections(self.config.max_connections)
            .connect(&service.dsn)
            .await?;
        tracing::info!(
            max_connections = self.config.max_connections,
            "connection pool ready"
        );

        let resolver: Arc<dyn RelationResolver + Send + Sync> =
            match SchemaCache::load(&pool).await {
                Ok(cache) => {
                    tracing::info!(tables = cache.table_count(), "schema cache loaded");
                    Arc::new(cache)
                }
                Err(error) => {
                    tracing::warn!(%error, "schema introspection failed; using naming conventions");
                    Arc::new(ConventionResolver)
                }
            };

        self.state = Some(Arc::new(GatewayState {
            pool,
            resolver,
            config: self.config.clone(),
        }));
        Ok(())
    }

    /// Serve requests until the process stops.
    pub async fn serve(&self) -> Result<(), GatewayError> {
        let state = self.state.as_ref().ok_or_else(|| {
            GatewayError::Config("gateway not initialized; call init() first".to_string())
        })?;

        let router = create_router(Arc::clone(state));
        let addr = &self.config.bind_address;

        tracing::info!("restql gateway listening on {addr}");
        tracing::info!("  GET    /{{table}}  - select rows");
        tracing::info!("  POST   /{{table}}  - insert rows (Prefer: resolution=merge-duplicates upserts)");
        tracing::info!("  PATCH  /{{table}}  - update rows");

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Config(format!("failed to bind {addr}: {e}")))?;
        axum::serve(listener, router)
            .await
            .map_err(|e| GatewayError::Internal(e.into()))?;
        Ok(())
    }
}
