//! # Repository Traits
//!
//! Abstract repository interfaces for domain entities.
//! Implementations can be swapped for different backends (in-memory, a real
//! database, a test double that injects failures).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use fleet_domain::{Delivery, DeliveryStatus, Drone, FleetEvent};

/// Boolean filter applied to fetched entities
pub type Predicate<'a, T> = &'a (dyn Fn(&T) -> bool + Send + Sync);

// =============================================================================
// DRONE REPOSITORY
// =============================================================================

/// Repository for Drone entity operations
#[async_trait]
pub trait DroneRepository: Send + Sync {
    /// Get every drone, in storage order
    async fn get_all(&self) -> Result<Vec<Drone>>;

    /// Get drones matching a predicate, in storage order
    async fn get_where(&self, predicate: Predicate<'_, Drone>) -> Result<Vec<Drone>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|drone| predicate(drone))
            .collect())
    }

    /// Get drone by ID
    async fn get_by_id(&self, drone_id: Uuid) -> Result<Option<Drone>>;

    /// Create a new drone; serial numbers are unique
    async fn insert(&self, drone: &Drone) -> Result<()>;

    /// Replace a stored drone record
    async fn update(&self, drone: &Drone) -> Result<()>;
}

// =============================================================================
// DELIVERY REPOSITORY
// =============================================================================

/// Repository for Delivery entity operations
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// Get every delivery, in intake order
    async fn get_all(&self) -> Result<Vec<Delivery>>;

    /// Get deliveries matching a predicate, in intake order
    async fn get_where(&self, predicate: Predicate<'_, Delivery>) -> Result<Vec<Delivery>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|delivery| predicate(delivery))
            .collect())
    }

    /// Get delivery by ID
    async fn get_by_id(&self, delivery_id: Uuid) -> Result<Option<Delivery>>;

    /// Get the delivery a drone is currently carrying
    async fn get_in_progress_for(&self, drone_id: Uuid) -> Result<Option<Delivery>> {
        Ok(self
            .get_where(&move |d: &Delivery| {
                d.status == DeliveryStatus::InProgress && d.assigned_drone_id == Some(drone_id)
            })
            .await?
            .into_iter()
            .next())
    }

    /// Create a new delivery
    async fn insert(&self, delivery: &Delivery) -> Result<()>;

    /// Replace a stored delivery record
    async fn update(&self, delivery: &Delivery) -> Result<()>;
}

// =============================================================================
// EVENT REPOSITORY
// =============================================================================

/// Repository for the fleet activity feed
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Append an event to the feed
    async fn append(&self, event: &FleetEvent) -> Result<()>;

    /// Most recent events, newest first
    async fn recent(&self, count: usize) -> Result<Vec<FleetEvent>>;
}

// =============================================================================
// FLEET STORE
// =============================================================================

/// Aggregate access to every repository the engine needs
pub trait FleetStore: Send + Sync {
    type Drones: DroneRepository;
    type Deliveries: DeliveryRepository;
    type Events: EventRepository;

    /// Get drone repository
    fn drones(&self) -> &Self::Drones;

    /// Get delivery repository
    fn deliveries(&self) -> &Self::Deliveries;

    /// Get event repository
    fn events(&self) -> &Self::Events;
}
