//! # Fleet Persistence Library
//!
//! Repository layer consumed by the delivery fleet engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Allocation / Movement Engine                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FleetStore trait                         │
//! │   (DroneRepository, DeliveryRepository, EventRepository)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │        InMemoryFleetStore  (seeded from / dumped to JSON)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine only reads whole (optionally filtered) collections and writes
//! single records back, so any backend that can do that can stand behind
//! the traits.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fleet_persistence::{DroneRepository, FleetStore, InMemoryFleetStore};
//!
//! let fleet = InMemoryFleetStore::read_fleet_file("fleet.json").await?;
//! let store = InMemoryFleetStore::with_fleet(fleet).await?;
//! let drones = store.drones().get_all().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod repository;

// Re-export commonly used types
pub use error::{PersistenceError, Result};
pub use repository::{
    DeliveryRepository, DroneRepository, EventRepository, FleetFile, FleetStore,
    InMemoryDeliveryRepository, InMemoryDroneRepository, InMemoryEventRepository,
    InMemoryFleetStore, Predicate,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
