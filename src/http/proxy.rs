//! Request dispatch to backends.
//!
//! # Responsibilities
//! - Pick one backend per request (round-robin, no retry)
//! - Refuse to forward to a backend marked unhealthy
//! - Forward method, path, query and headers; stream the body both ways
//! - Log and count every outcome

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, Version},
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::config::TimeoutConfig;
use crate::health::HealthTable;
use crate::http::request::{forward_headers, request_id};
use crate::http::response::DispatchError;
use crate::load_balancer::{Backend, BackendSet, LoadBalancer};
use crate::observability::metrics;

/// Per-request entry point shared by all handler tasks.
#[derive(Debug)]
pub struct Dispatcher {
    backends: Arc<BackendSet>,
    balancer: Box<dyn LoadBalancer>,
    health: Arc<HealthTable>,
    client: Client<HttpConnector, Body>,
    upstream_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        backends: Arc<BackendSet>,
        balancer: Box<dyn LoadBalancer>,
        health: Arc<HealthTable>,
        timeouts: &TimeoutConfig,
    ) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect()));
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(timeouts.pool_idle())
            .build(connector);

        Self {
            backends,
            balancer,
            health,
            client,
            upstream_timeout: timeouts.upstream(),
        }
    }

    pub fn backends(&self) -> &Arc<BackendSet> {
        &self.backends
    }

    pub fn health(&self) -> &Arc<HealthTable> {
        &self.health
    }

    /// Take the next backend in rotation and check that it may be used.
    ///
    /// The rotation advances even when the chosen backend is unhealthy.
    pub fn select(&self) -> Result<&Backend, DispatchError> {
        let backend = self
            .balancer
            .next_server(&self.backends)
            .ok_or(DispatchError::NoBackends)?;

        if !self.health.is_healthy(backend) {
            return Err(DispatchError::Unhealthy(backend.address().to_string()));
        }
        Ok(backend)
    }

    /// Forward `request` to `backend` and stream its response back.
    pub async fn forward(
        &self,
        backend: &Backend,
        request: Request<Body>,
    ) -> Result<Response, DispatchError> {
        let outbound = build_upstream_request(backend, request)?;

        let response = match time::timeout(self.upstream_timeout, self.client.request(outbound)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(DispatchError::Upstream(e)),
            Err(_) => return Err(DispatchError::UpstreamTimeout(self.upstream_timeout)),
        };

        // Status and headers are committed before the body streams, so a
        // body failure can only be logged.
        let (parts, body) = response.into_parts();
        let label = backend.address().to_string();
        let body = body.map_err(move |e| {
            tracing::error!(backend = %label, error = %e, "Error copying response body");
            e
        });
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Rewrite an inbound request to target `backend`, keeping method, path,
/// query, headers and the (unbuffered) body.
pub fn build_upstream_request(
    backend: &Backend,
    request: Request<Body>,
) -> Result<Request<Body>, DispatchError> {
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = backend.target(path_and_query);

    let mut builder = Request::builder()
        .method(parts.method)
        .uri(uri.as_str())
        .version(Version::HTTP_11);
    if let Some(headers) = builder.headers_mut() {
        *headers = forward_headers(&parts.headers);
    }

    builder.body(body).map_err(DispatchError::BuildRequest)
}

/// Catch-all handler: one round-robin pick, one attempt.
pub async fn proxy_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request).to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let backend = match dispatcher.select() {
        Ok(backend) => backend,
        Err(e) => {
            tracing::warn!(request_id = %request_id, method = %method, path = %path, error = %e, "Request rejected");
            metrics::record_request(&method, e.status().as_u16(), metrics::NO_BACKEND, start);
            return e.into_response();
        }
    };

    match dispatcher.forward(backend, request).await {
        Ok(response) => {
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                backend = %backend,
                status = response.status().as_u16(),
                elapsed = ?start.elapsed(),
                "Forwarded request"
            );
            metrics::record_request(&method, response.status().as_u16(), backend.address(), start);
            response
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, backend = %backend, error = %e, "Error forwarding request");
            metrics::record_request(&method, e.status().as_u16(), backend.address(), start);
            e.into_response()
        }
    }
}
