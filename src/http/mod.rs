//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful drain)
//!     → request.rs (request ID, header preparation)
//!     → proxy.rs (pick backend, check health, forward, stream back)
//!     → response.rs (error mapping, panic recovery)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::Dispatcher;
pub use request::X_REQUEST_ID;
pub use response::DispatchError;
pub use server::{HttpServer, ServerError};
