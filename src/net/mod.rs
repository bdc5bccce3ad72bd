//! Network layer for client-facing connections.
//!
//! # Data Flow
//! ```text
//! TCP accept (http/server.rs)
//!     → connection.rs (connection ID, idle and write deadlines)
//!     → hyper connection (header read deadline, keep-alive)
//!     → Router
//! ```
//!
//! # Design Decisions
//! - Deadlines live on the socket wrapper so they apply to every protocol
//!   hyper speaks on it, including idle keep-alive gaps

pub mod connection;

pub use connection::{ConnectionId, DeadlineStream};
