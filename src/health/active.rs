//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend, one after another
//! - Apply each sweep's results to the health table in one write
//! - Log health transitions and probe failures

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::state::{HealthTable, HealthTransition};
use crate::lifecycle::Shutdown;
use crate::load_balancer::{Backend, BackendSet};
use crate::observability::metrics;

const PROBE_USER_AGENT: &str = "lb-proxy-health-check";

pub struct HealthMonitor {
    backends: Arc<BackendSet>,
    health: Arc<HealthTable>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(
        backends: Arc<BackendSet>,
        health: Arc<HealthTable>,
        config: HealthCheckConfig,
    ) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.timeout()));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            backends,
            health,
            config,
            client,
        }
    }

    /// Probe on a fixed interval until the shutdown signal fires.
    ///
    /// The first sweep runs one interval after start; until then every
    /// backend keeps its optimistic healthy flag.
    pub async fn run(self, shutdown: Shutdown) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        let interval = self.config.interval();
        tracing::info!(
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            path = %self.config.path,
            backends = self.backends.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let signalled = shutdown.signalled();
        tokio::pin!(signalled);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut signalled => break,
            }
            tokio::select! {
                _ = self.sweep() => {}
                _ = &mut signalled => break,
            }
        }

        tracing::info!("Health monitor received shutdown signal, exiting loop");
    }

    /// Probe every backend once and publish the results.
    pub async fn sweep(&self) {
        let mut results = Vec::with_capacity(self.backends.len());
        for backend in self.backends.iter() {
            let healthy = self.probe(backend).await;
            metrics::record_backend_health(backend.address(), healthy);
            results.push((backend.index(), healthy));
        }

        for (index, transition) in self.health.apply_sweep(&results) {
            let Some(backend) = self.backends.get(index) else {
                continue;
            };
            match transition {
                HealthTransition::BecameUnhealthy => {
                    tracing::warn!(backend = %backend, "Backend marked unhealthy")
                }
                HealthTransition::BecameHealthy => {
                    tracing::info!(backend = %backend, "Backend recovered")
                }
            }
        }
    }

    /// Issue one liveness request. Any 2xx answer counts as healthy.
    pub async fn probe(&self, backend: &Backend) -> bool {
        let uri = backend.target(&self.config.path);
        let request = match Request::builder()
            .method(Method::GET)
            .uri(uri.as_str())
            .header(header::USER_AGENT, PROBE_USER_AGENT)
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(backend = %backend, error = %e, "Failed to build health check request");
                return false;
            }
        };

        let timeout: Duration = self.config.timeout();
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(backend = %backend, status = %response.status(), "Health check failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = %backend, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(backend = %backend, timeout_ms = self.config.timeout_ms, "Health check failed: timeout");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU16, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Backend answering every request with the status currently stored in `status`.
    async fn status_backend(status: Arc<AtomicU16>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let status = status.load(Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let reply = format!(
                        "HTTP/1.1 {status} X\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    );
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        addr
    }

    async fn closed_port() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    fn monitor(addresses: &[String]) -> (HealthMonitor, Arc<BackendSet>, Arc<HealthTable>) {
        let backends = Arc::new(BackendSet::from_addresses(addresses).unwrap());
        let health = Arc::new(HealthTable::for_backends(&backends));
        let config = HealthCheckConfig {
            interval_ms: 50,
            timeout_ms: 500,
            ..HealthCheckConfig::default()
        };
        (
            HealthMonitor::new(backends.clone(), health.clone(), config),
            backends,
            health,
        )
    }

    #[tokio::test]
    async fn sweep_marks_failing_backends_without_stopping() {
        let ok = status_backend(Arc::new(AtomicU16::new(200))).await;
        let failing = status_backend(Arc::new(AtomicU16::new(500))).await;
        let dead = closed_port().await;

        let (monitor, _, health) = monitor(&[
            format!("http://{dead}"),
            format!("http://{failing}"),
            format!("http://{ok}"),
        ]);

        monitor.sweep().await;
        assert_eq!(health.snapshot(), vec![false, false, true]);
    }

    #[tokio::test]
    async fn sweep_restores_recovered_backend() {
        let status = Arc::new(AtomicU16::new(503));
        let addr = status_backend(status.clone()).await;
        let (monitor, backends, health) = monitor(&[format!("http://{addr}")]);
        let backend = backends.get(0).unwrap();

        monitor.sweep().await;
        assert!(!health.is_healthy(backend));

        status.store(202, Ordering::SeqCst);
        monitor.sweep().await;
        assert!(health.is_healthy(backend));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (monitor, _, _) = monitor(&[]);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(monitor.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(120)).await;
        shutdown.trigger();
        time::timeout(Duration::from_secs(1), task)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }
}
