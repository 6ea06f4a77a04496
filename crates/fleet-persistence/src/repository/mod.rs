//! # Repository Module
//!
//! Repository traits for fleet entities and their in-memory implementation.

pub mod memory;
pub mod traits;

pub use memory::{
    FleetFile, InMemoryDeliveryRepository, InMemoryDroneRepository, InMemoryEventRepository,
    InMemoryFleetStore,
};
pub use traits::{DeliveryRepository, DroneRepository, EventRepository, FleetStore, Predicate};
