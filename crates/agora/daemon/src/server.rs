//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{DaemonConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use agora_core::CivicContext;
use agora_storage::memory::InMemoryCivicStorage;
use agora_storage::CivicStorage;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Agora daemon server
pub struct Server {
    config: DaemonConfig,
    storage: Arc<dyn CivicStorage>,
}

impl Server {
    /// Create a server, connecting the configured storage backend
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        config
            .policy
            .validate()
            .map_err(|e| DaemonError::Config(format!("invalid policy: {e}")))?;
        let storage = open_storage(&config.storage).await?;
        Ok(Self { config, storage })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let ctx = CivicContext::new(self.storage.clone(), self.config.policy.clone());
        let app = create_router(AppState::new(ctx), &self.config.server);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "agora daemon listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("agora daemon shutting down");
        Ok(())
    }
}

async fn open_storage(config: &StorageConfig) -> DaemonResult<Arc<dyn CivicStorage>> {
    match config {
        StorageConfig::Memory => {
            tracing::warn!("using in-memory storage; state is lost on restart");
            Ok(Arc::new(InMemoryCivicStorage::new()))
        }
        #[cfg(feature = "postgres")]
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            let store = agora_storage::postgres::PostgresCivicStorage::connect_with_options(
                url,
                *max_connections,
                *connect_timeout_secs,
            )
            .await?;
            tracing::info!(max_connections, "connected to postgres");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        StorageConfig::Postgres { .. } => Err(DaemonError::Config(
            "postgres storage requires the `postgres` feature".to_string(),
        )),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_storage::PartyStore;

    #[tokio::test]
    async fn test_memory_storage_opens() {
        let server = Server::new(DaemonConfig::default()).await.unwrap();
        assert!(server.storage.list_parties().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_policy_is_a_config_error() {
        let mut config = DaemonConfig::default();
        config.policy.decay_percent = 120;
        assert!(matches!(
            Server::new(config).await,
            Err(DaemonError::Config(_))
        ));
    }
}
