//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each backend (GET <backend>/health)
//!     → Apply the whole sweep to state.rs
//!
//! Health table (state.rs):
//!     One flag per backend, all healthy at startup
//!     → read by every request, written by the monitor only
//! ```
//!
//! # Design Decisions
//! - The monitor and the request handlers share nothing but the health table
//! - A single probe result decides the flag; there is no hysteresis
//! - Probe failures are logged, never surfaced to clients

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::{HealthTable, HealthTransition};
