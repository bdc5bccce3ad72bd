//! Round-robin HTTP load balancer library.
//!
//! Requests are spread over a fixed backend set in rotation. A background
//! monitor probes every backend and requests routed to a backend that
//! failed its last probe are answered with 503.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::LbConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
