//! lb-proxy: a round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌──────────────────────────────────────────────┐
//!     ────────────────────┼─▶ http server ─▶ dispatcher ─▶ round robin   │
//!                         │                      │                       │
//!                         │                      ▼                       │
//!                         │                health table ◀── health       │
//!                         │                      │          monitor      │
//!                         │                      ▼             │         │
//!     Client Response     │                backend call        │ probes  │
//!     ◀───────────────────┼── streamed body ◀────┘             ▼         │
//!                         └────────────────────────────────── Backends ──┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use lb_proxy::config::load_config;
use lb_proxy::lifecycle::start;
use lb_proxy::observability::logging::init_logging;

#[derive(Parser)]
#[command(version, about = "Round-robin HTTP load balancer", long_about = None)]
struct Cli {
    /// Configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the listener bind address, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    if cli.check {
        println!("Configuration OK: {} backend(s)", config.servers.len());
        return ExitCode::SUCCESS;
    }

    init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "lb-proxy starting"
    );

    match start(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
