//! Minimal backend for trying the load balancer by hand.
//!
//! Serves `/health` for the prober and answers every other path with the
//! backend's name, so the rotation is visible from a client.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    routing::{get, post},
    Router,
};
use clap::Parser;

#[derive(Parser)]
#[command(version, about = "Mock HTTP backend for lb-proxy")]
struct Cli {
    #[arg(long, default_value_t = 8081)]
    port: u16,

    /// Name returned in response bodies (defaults to "backend-<port>")
    #[arg(long)]
    name: Option<String>,
}

#[derive(Clone)]
struct Backend {
    name: Arc<str>,
    healthy: Arc<AtomicBool>,
}

async fn health(State(backend): State<Backend>) -> (StatusCode, &'static str) {
    if backend.healthy.load(Ordering::Relaxed) {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    }
}

/// Flip the health endpoint between 200 and 503.
async fn toggle(State(backend): State<Backend>) -> String {
    let was = backend.healthy.fetch_xor(true, Ordering::Relaxed);
    format!("{} healthy={}\n", backend.name, !was)
}

async fn hello(State(backend): State<Backend>, uri: Uri) -> String {
    format!("Hello from {} ({})\n", backend.name, uri.path())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let name = cli.name.unwrap_or_else(|| format!("backend-{}", cli.port));
    let state = Backend {
        name: name.into(),
        healthy: Arc::new(AtomicBool::new(true)),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/toggle", post(toggle))
        .fallback(hello)
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    println!("Mock backend listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
