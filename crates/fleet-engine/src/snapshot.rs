//! Point-in-time fleet state handed to each pass.

use fleet_domain::{Delivery, Drone};
use fleet_persistence::{DeliveryRepository, DroneRepository, FleetStore, Predicate};

use crate::error::Result;

/// Drones and deliveries read at the start of a pass.
///
/// Passes plan against this owned copy and write changed records back
/// explicitly; nothing is mutated through the store while planning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetSnapshot {
    pub drones: Vec<Drone>,
    pub deliveries: Vec<Delivery>,
}

impl FleetSnapshot {
    pub fn new(drones: Vec<Drone>, deliveries: Vec<Delivery>) -> Self {
        Self { drones, deliveries }
    }

    /// Read every drone and delivery.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn load<S: FleetStore>(store: &S) -> Result<Self> {
        Ok(Self {
            drones: store.drones().get_all().await?,
            deliveries: store.deliveries().get_all().await?,
        })
    }

    /// Read the drones and deliveries matching the given predicates.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn load_where<S: FleetStore>(
        store: &S,
        drones: Predicate<'_, Drone>,
        deliveries: Predicate<'_, Delivery>,
    ) -> Result<Self> {
        Ok(Self {
            drones: store.drones().get_where(drones).await?,
            deliveries: store.deliveries().get_where(deliveries).await?,
        })
    }
}
