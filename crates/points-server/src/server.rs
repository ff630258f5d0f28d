use std::sync::Arc;
use std::time::Duration;

use points_ledger::Ledger;
use points_lock::CleanupPolicy;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::PointsConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Points HTTP server over an in-memory ledger.
pub struct PointsServer {
    config: PointsConfig,
    ledger: Arc<Ledger>,
}

impl PointsServer {
    pub fn new(config: PointsConfig) -> Self {
        let ledger = Arc::new(Ledger::in_memory(
            config.ledger.clone(),
            config.store.clone(),
        ));
        Self { config, ledger }
    }

    pub fn config(&self) -> &PointsConfig {
        &self.config
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.ledger)
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.ledger(), &self.config.server)
    }

    /// Start serving requests until ctrl-c.
    pub async fn serve(self) -> ServerResult<()> {
        let sweeper = spawn_sweeper(self.ledger());
        let app = self.router();
        let listener = TcpListener::bind(&self.config.server.bind_addr).await?;
        tracing::info!("points server listening on {}", self.config.server.bind_addr);
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));
        if let Some(handle) = sweeper {
            handle.abort();
        }
        result
    }
}

/// Periodically drop idle per-user locks when cleanup is deferred.
pub fn spawn_sweeper(ledger: Arc<Ledger>) -> Option<JoinHandle<()>> {
    if ledger.config().cleanup != CleanupPolicy::Deferred {
        return None;
    }
    let period = ledger.config().sweep_interval().max(Duration::from_millis(1));
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = ledger.sweep_locks();
            tracing::debug!(removed, resident = ledger.resident_locks(), "lock sweep");
        }
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use points_ledger::LedgerConfig;
    use points_types::UserId;

    #[test]
    fn server_construction() {
        let server = PointsServer::new(PointsConfig::default());
        assert_eq!(server.config().server.bind_addr.port(), 8080);
        assert_eq!(server.ledger().resident_locks(), 0);
    }

    #[tokio::test]
    async fn no_sweeper_for_immediate_cleanup() {
        let server = PointsServer::new(PointsConfig::default());
        assert!(spawn_sweeper(server.ledger()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_drops_idle_locks() {
        let config = PointsConfig {
            ledger: LedgerConfig {
                cleanup: CleanupPolicy::Deferred,
                sweep_interval_ms: 100,
                ..LedgerConfig::default()
            },
            ..PointsConfig::default()
        };
        let server = PointsServer::new(config);
        let ledger = server.ledger();
        for id in 0..3 {
            ledger.charge(UserId::new(id), 5).await.unwrap();
        }
        assert_eq!(ledger.resident_locks(), 3);

        let handle = spawn_sweeper(server.ledger()).expect("deferred cleanup");
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(ledger.resident_locks(), 0);
        handle.abort();
    }
}
