//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with one catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Bind the server to a listener and shut it down gracefully
//! - Dispatch every request to the proxy orchestrator

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::proxy::{ProxyService, ServiceError};
use crate::lifecycle::ShutdownSignal;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ProxyService>,
    pub shutdown: ShutdownSignal,
}

/// HTTP server for the switch.
pub struct HttpServer {
    proxy: Arc<ProxyService>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServiceError> {
        let proxy = Arc::new(ProxyService::new(Arc::new(config))?);
        Ok(Self { proxy })
    }

    /// The orchestrator shared by every request.
    pub fn proxy(&self) -> &Arc<ProxyService> {
        &self.proxy
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            groups = ?self.proxy.router().groups(),
            "HTTP server starting"
        );

        let router = Self::build_router(AppState {
            proxy: self.proxy.clone(),
            shutdown: shutdown.clone(),
        });

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.triggered().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every method, every path.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.proxy.handle(request, &state.shutdown).await
}
