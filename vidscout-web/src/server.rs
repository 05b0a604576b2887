//! Axum server for the resolution API
//!
//! Wires the shared resolver into a router and serves it on the configured
//! address.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vidscout_core::config::VidscoutConfig;
use vidscout_core::{MirrorRegistry, RuntimeMode, ServerComponents, SourceResolver};

use crate::handlers::{api_cache_stats, api_providers, api_stream, health};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Cache-backed resolver
    pub resolver: SourceResolver,
    /// Mode the service was started in
    pub mode: RuntimeMode,
    /// Process start, for uptime reporting
    pub server_started_at: Instant,
}

impl AppState {
    /// Creates state from prebuilt components.
    pub fn new(components: ServerComponents) -> Self {
        Self {
            resolver: components.resolver,
            mode: components.mode,
            server_started_at: Instant::now(),
        }
    }

    /// Registry backing the resolver
    pub fn registry(&self) -> &Arc<MirrorRegistry> {
        self.resolver.registry()
    }
}

/// Builds the API router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/stream", get(api_stream))
        .route("/api/providers", get(api_providers))
        .route("/api/cache/stats", get(api_cache_stats))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs the API server until the process is stopped.
///
/// # Errors
/// - `VidscoutError::Registry` / `VidscoutError::Probe` - Invalid mirror
///   configuration or HTTP client setup failure
/// - `VidscoutError::Io` - Address could not be bound or the server failed
pub async fn run_server(
    config: VidscoutConfig,
    mode: RuntimeMode,
) -> vidscout_core::Result<()> {
    let components = ServerComponents::build(&config, mode)?;
    let app = build_router(AppState::new(components));

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(%mode, "Vidscout resolution API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
