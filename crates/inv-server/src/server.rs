use std::future::Future;
use std::sync::Arc;

use inv_store::ItemStore;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Inventory HTTP server.
pub struct InventoryServer {
    config: ServerConfig,
    store: Arc<ItemStore>,
}

impl InventoryServer {
    pub fn new(config: ServerConfig, store: Arc<ItemStore>) -> Self {
        Self { config, store }
    }

    /// Open the store under `config.cache_dir`, creating the directory if needed.
    pub async fn open(config: ServerConfig) -> ServerResult<Self> {
        let store = ItemStore::open(config.store_config()).await?;
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ItemStore> {
        &self.store
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(Arc::clone(&self.store)), &self.config)
    }

    /// Serve requests until `shutdown` resolves.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            cache_dir = %self.config.cache_dir.display(),
            "inventory server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!("inventory server stopped");
        Ok(())
    }
}
