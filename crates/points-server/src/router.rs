use std::sync::Arc;

use axum::routing::{get, patch};
use axum::Router;
use points_ledger::Ledger;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handler::{self, AppState};

/// Build the axum router with all points endpoints.
///
/// At most `config.max_connections` requests are in flight at once, counted
/// across every clone of the router.
pub fn build_router(ledger: Arc<Ledger>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/point/:id", get(handler::point_handler))
        .route("/point/:id/histories", get(handler::histories_handler))
        .route("/point/:id/charge", patch(handler::charge_handler))
        .route("/point/:id/use", patch(handler::use_handler))
        .layer(GlobalConcurrencyLimitLayer::new(config.max_connections.max(1)))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { ledger })
}
