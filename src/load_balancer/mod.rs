//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives at the dispatcher
//!     → backend.rs (fixed, ordered BackendSet)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through backends)
//!     → Return the chosen backend (health is checked by the dispatcher)
//! ```
//!
//! # Design Decisions
//! - The backend set never changes after startup
//! - Selection is health-unaware: an unhealthy backend still consumes its
//!   turn and is refused at dispatch time
//! - Strategies are chosen by name from configuration; unknown names are
//!   rejected during validation

use std::fmt;
use std::str::FromStr;

pub mod backend;
pub mod round_robin;

pub use backend::{Backend, BackendSet, BackendSetError};
pub use round_robin::RoundRobin;

/// A backend selection algorithm.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Pick the next backend, or `None` when the set is empty.
    fn next_server<'a>(&self, backends: &'a BackendSet) -> Option<&'a Backend>;
}

/// Selection strategies accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    RoundRobin,
}

impl Strategy {
    /// Build the balancer implementing this strategy.
    pub fn build(self) -> Box<dyn LoadBalancer> {
        match self {
            Strategy::RoundRobin => Box::new(RoundRobin::new()),
        }
    }
}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "round-robin" | "round_robin" | "rr" => Ok(Strategy::RoundRobin),
            _ => Err(UnknownStrategy(value.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::RoundRobin => f.write_str("round-robin"),
        }
    }
}

/// Returned when a strategy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported load balancing strategy: {0}")]
pub struct UnknownStrategy(pub String);
