//! Engine error types.

use thiserror::Error;

/// Errors raised by engine passes and setup.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Repository read or write failed; aborts the current pass
    #[error("Persistence error: {0}")]
    Persistence(#[from] fleet_persistence::PersistenceError),

    /// Movement failed after allocations were already persisted
    #[error("Movement pass failed after {allocated} allocations: {source}")]
    MovementFailed {
        allocated: usize,
        #[source]
        source: Box<EngineError>,
    },

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// Allocations persisted before the failure
    pub fn allocated(&self) -> usize {
        match self {
            Self::MovementFailed { allocated, .. } => *allocated,
            _ => 0,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
