//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` assembles the security
//! layers, `start()` binds the TCP listener, and `serve()` starts accepting
//! connections until the shutdown future resolves.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context as _;
use axum::error_handling::HandleErrorLayer;
use axum::routing::get;
use axum::Router;
use gatehouse_core::{AuthorizationEventPublisher, AuthorizationManager, NoopEventPublisher};
use http::request::Parts;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{
    admin_status_handler, health_handler, liveness_handler, whoami_handler, AppState,
};
use super::middleware::build_http_layers;
use crate::authn::AuthenticationLayer;
use crate::filter::{handle_filter_error, AuthorizationFilterLayer};

/// Manages the HTTP server lifecycle around the authorization gate.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- captures configuration and the security layers
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule<M, P = NoopEventPublisher> {
    config: NetworkConfig,
    authentication: AuthenticationLayer,
    authorization: AuthorizationFilterLayer<M, P>,
    listener: Option<TcpListener>,
    draining: Arc<AtomicBool>,
}

impl<M, P> NetworkModule<M, P>
where
    M: AuthorizationManager<Parts> + 'static,
    P: AuthorizationEventPublisher<Parts> + 'static,
{
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        authentication: AuthenticationLayer,
        authorization: AuthorizationFilterLayer<M, P>,
    ) -> Self {
        Self {
            config,
            authentication,
            authorization,
            listener: None,
            draining: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /api/me` -- the caller's identity
    /// - `GET /api/admin/status` -- administrative status
    ///
    /// Every route passes through authentication, then the authorization
    /// gate; which routes are public is decided by the gate's manager.
    pub fn build_router(&self) -> Router {
        let state = AppState::new(Arc::clone(&self.draining));

        let security = ServiceBuilder::new()
            .layer(self.authentication.clone())
            .layer(HandleErrorLayer::new(handle_filter_error))
            .layer(self.authorization.clone());

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/api/me", get(whoami_handler))
            .route("/api/admin/status", get(admin_status_handler))
            .layer(security)
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown future resolves, then lets
    /// in-flight requests finish. `/health` reports `draining` from that
    /// point on.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .take()
            .context("start() must be called before serve()")?;

        let draining = Arc::clone(&self.draining);
        let shutdown = async move {
            shutdown.await;
            draining.store(true, Ordering::Release);
            info!("Draining in-flight requests");
        };

        info!("Serving HTTP connections");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Server stopped");
        Ok(())
    }
}
