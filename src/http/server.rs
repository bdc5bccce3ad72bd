//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the backend set, health table and dispatcher from configuration
//! - Create the Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, timeout, panic recovery)
//! - Spawn the health monitor
//! - Serve connections with edge deadlines (header read, write, idle)
//! - Serve until shutdown, then drain within the deadline

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, routing::any, Router};
use hyper::{body::Incoming, service::service_fn};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::{conn::auto, graceful::GracefulShutdown},
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::time;
use tower::Service;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{LbConfig, TimeoutConfig};
use crate::health::{HealthMonitor, HealthTable};
use crate::http::proxy::{proxy_handler, Dispatcher};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::panic_response;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{BackendSet, BackendSetError, Strategy, UnknownStrategy};
use crate::net::{ConnectionId, DeadlineStream};

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Configuration the server cannot be built from.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Backend(#[from] BackendSetError),

    #[error(transparent)]
    Strategy(#[from] UnknownStrategy),
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: LbConfig,
    backends: Arc<BackendSet>,
    health: Arc<HealthTable>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: LbConfig) -> Result<Self, ServerError> {
        let strategy: Strategy = config.strategy.parse()?;
        let backends = Arc::new(BackendSet::from_addresses(&config.servers)?);
        let health = Arc::new(HealthTable::for_backends(&backends));

        let dispatcher = Arc::new(Dispatcher::new(
            backends.clone(),
            strategy.build(),
            health.clone(),
            &config.timeouts,
        ));

        tracing::info!(
            strategy = %strategy,
            backends = backends.len(),
            "Dispatcher ready"
        );

        let router = Self::build_router(&config, dispatcher);
        Ok(Self {
            router,
            config,
            backends,
            health,
        })
    }

    fn build_router(config: &LbConfig, dispatcher: Arc<Dispatcher>) -> Router {
        let router = Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(dispatcher);
        with_middleware(router, &config.timeouts)
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Every client connection carries the edge deadlines from
    /// `timeouts`: header read, write progress and idle. When `shutdown`
    /// fires the listener is closed, in-flight requests get
    /// `timeouts.drain_secs` to finish, and whatever is left is dropped.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(
                self.backends.clone(),
                self.health.clone(),
                self.config.health_check.clone(),
            );
            tokio::spawn(monitor.run(shutdown.clone()));
        } else {
            tracing::info!("Active health checks disabled; all backends stay healthy");
        }

        let timeouts = self.config.timeouts.clone();
        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(timeouts.header_read());
        builder.http2().timer(TokioTimer::new());

        let graceful = GracefulShutdown::new();
        let signalled = shutdown.signalled();
        tokio::pin!(signalled);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
                _ = &mut signalled => break,
            };

            let id = ConnectionId::new();
            tracing::debug!(connection_id = %id, peer_addr = %peer, "Connection accepted");

            let io = TokioIo::new(DeadlineStream::new(
                stream,
                timeouts.client_idle(),
                timeouts.write(),
            ));
            let router = self.router.clone();
            let service = service_fn(move |request: Request<Incoming>| router.clone().call(request));
            let connection = graceful.watch(builder.serve_connection_with_upgrades(io, service).into_owned());

            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::debug!(connection_id = %id, error = %e, "Connection closed with error");
                }
            });
        }

        drop(listener);
        let drain = timeouts.drain();
        tracing::info!(drain_secs = drain.as_secs(), "Shutdown signal received, draining in-flight requests");

        if time::timeout(drain, graceful.shutdown()).await.is_err() {
            tracing::warn!("Drain deadline elapsed, closing remaining connections");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn health(&self) -> &Arc<HealthTable> {
        &self.health
    }

    pub fn backends(&self) -> &Arc<BackendSet> {
        &self.backends
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &LbConfig {
        &self.config
    }
}

/// Wrap `router` in the request pipeline.
///
/// Outermost first: request ID assignment, tracing span, request ID echo,
/// panic recovery, request timeout.
#[allow(deprecated)]
pub fn with_middleware(router: Router, timeouts: &TimeoutConfig) -> Router {
    router
        .layer(TimeoutLayer::new(timeouts.request()))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id(request),
            )
        }))
        .layer(set_request_id_layer())
}
