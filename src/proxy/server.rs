//! Proxy HTTP server using Axum
//!
//! Binds the listener, wires the two routes, and serves with graceful
//! shutdown driven by a watch channel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::{MirageError, Result};
use crate::proxy::fetch::UpstreamFetcher;

use super::handler;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Arc<UpstreamFetcher>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = UpstreamFetcher::new(Duration::from_secs(config.fetch.timeout))?;

        Ok(Self {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
        })
    }
}

/// Create the router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/proxy", get(handler::proxy))
        .route("/", get(handler::usage))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Proxy server
pub struct ProxyServer {
    state: AppState,
}

impl ProxyServer {
    /// Create a new proxy server
    pub fn new(config: Config) -> Result<Self> {
        let state = AppState::new(config)?;
        Ok(Self { state })
    }

    /// Run the proxy server until the shutdown channel fires
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr_str = self.state.config.addr();
        let addr: SocketAddr = addr_str.parse().map_err(|_| {
            MirageError::InvalidConfig(format!("invalid listen address: {}", addr_str))
        })?;

        let router = build_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Proxy server listening on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| MirageError::Internal(e.to_string()))?;

        info!("Proxy server shut down");
        Ok(())
    }
}
