//! In-memory repository implementation.
//!
//! Records are kept in insertion order so that the engine sees deliveries in
//! intake order. A whole fleet can be seeded from, and exported to, a JSON
//! fleet file.

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::traits::{
    DeliveryRepository, DroneRepository, EventRepository, FleetStore, Predicate,
};
use crate::error::{PersistenceError, Result};
use fleet_domain::{Delivery, DeliveryStatus, Drone, FleetEvent};

/// Default number of events retained by the activity feed
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

// =============================================================================
// FLEET FILE
// =============================================================================

/// Serialized fleet state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetFile {
    pub drones: Vec<Drone>,
    pub deliveries: Vec<Delivery>,
}

impl FleetFile {
    /// Check every record against the domain invariants
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidRecord`] for the first record that
    /// breaks an invariant.
    pub fn validate(&self, base_epsilon: f64) -> Result<()> {
        for drone in &self.drones {
            drone.validate(base_epsilon)?;
        }
        for delivery in &self.deliveries {
            let needs_drone = matches!(
                delivery.status,
                DeliveryStatus::InProgress | DeliveryStatus::Delivered
            );
            let has_drone = delivery.assigned_drone_id.is_some();
            if needs_drone && !has_drone {
                return Err(PersistenceError::InvalidRecord(format!(
                    "delivery {} is {} without an assigned drone",
                    delivery.delivery_id, delivery.status
                )));
            }
            if delivery.status == DeliveryStatus::Pending && has_drone {
                return Err(PersistenceError::InvalidRecord(format!(
                    "pending delivery {} already has an assigned drone",
                    delivery.delivery_id
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// DRONE REPOSITORY
// =============================================================================

/// Drone repository backed by an ordered vector
#[derive(Debug, Default)]
pub struct InMemoryDroneRepository {
    drones: RwLock<Vec<Drone>>,
}

#[async_trait]
impl DroneRepository for InMemoryDroneRepository {
    async fn get_all(&self) -> Result<Vec<Drone>> {
        Ok(self.drones.read().await.clone())
    }

    async fn get_where(&self, predicate: Predicate<'_, Drone>) -> Result<Vec<Drone>> {
        Ok(self
            .drones
            .read()
            .await
            .iter()
            .filter(|drone| predicate(drone))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, drone_id: Uuid) -> Result<Option<Drone>> {
        Ok(self
            .drones
            .read()
            .await
            .iter()
            .find(|d| d.drone_id == drone_id)
            .cloned())
    }

    async fn insert(&self, drone: &Drone) -> Result<()> {
        let mut drones = self.drones.write().await;
        if let Some(existing) = drones
            .iter()
            .find(|d| d.drone_id == drone.drone_id || d.serial_number == drone.serial_number)
        {
            return Err(PersistenceError::WriteConflict(format!(
                "drone {} ({}) already exists",
                existing.drone_id, existing.serial_number
            )));
        }
        drones.push(drone.clone());
        Ok(())
    }

    async fn update(&self, drone: &Drone) -> Result<()> {
        let mut drones = self.drones.write().await;
        let slot = drones
            .iter_mut()
            .find(|d| d.drone_id == drone.drone_id)
            .ok_or_else(|| PersistenceError::not_found("Drone", drone.drone_id))?;
        *slot = drone.clone();
        Ok(())
    }
}

// =============================================================================
// DELIVERY REPOSITORY
// =============================================================================

/// Delivery repository backed by an ordered vector
#[derive(Debug, Default)]
pub struct InMemoryDeliveryRepository {
    deliveries: RwLock<Vec<Delivery>>,
}

#[async_trait]
impl DeliveryRepository for InMemoryDeliveryRepository {
    async fn get_all(&self) -> Result<Vec<Delivery>> {
        Ok(self.deliveries.read().await.clone())
    }

    async fn get_where(&self, predicate: Predicate<'_, Delivery>) -> Result<Vec<Delivery>> {
        Ok(self
            .deliveries
            .read()
            .await
            .iter()
            .filter(|delivery| predicate(delivery))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, delivery_id: Uuid) -> Result<Option<Delivery>> {
        Ok(self
            .deliveries
            .read()
            .await
            .iter()
            .find(|d| d.delivery_id == delivery_id)
            .cloned())
    }

    async fn insert(&self, delivery: &Delivery) -> Result<()> {
        let mut deliveries = self.deliveries.write().await;
        if deliveries
            .iter()
            .any(|d| d.delivery_id == delivery.delivery_id)
        {
            return Err(PersistenceError::WriteConflict(format!(
                "delivery {} already exists",
                delivery.delivery_id
            )));
        }
        deliveries.push(delivery.clone());
        Ok(())
    }

    async fn update(&self, delivery: &Delivery) -> Result<()> {
        let mut deliveries = self.deliveries.write().await;
        let slot = deliveries
            .iter_mut()
            .find(|d| d.delivery_id == delivery.delivery_id)
            .ok_or_else(|| PersistenceError::not_found("Delivery", delivery.delivery_id))?;
        *slot = delivery.clone();
        Ok(())
    }
}

// =============================================================================
// EVENT REPOSITORY
// =============================================================================

/// Bounded activity feed; the oldest events are dropped first
#[derive(Debug)]
pub struct InMemoryEventRepository {
    events: RwLock<VecDeque<FleetEvent>>,
    capacity: usize,
}

impl InMemoryEventRepository {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_CAPACITY))),
            capacity,
        }
    }
}

impl Default for InMemoryEventRepository {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn append(&self, event: &FleetEvent) -> Result<()> {
        let mut events = self.events.write().await;
        events.push_back(event.clone());
        while events.len() > self.capacity {
            events.pop_front();
        }
        Ok(())
    }

    async fn recent(&self, count: usize) -> Result<Vec<FleetEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .rev()
            .take(count)
            .cloned()
            .collect())
    }
}

// =============================================================================
// FLEET STORE
// =============================================================================

/// In-memory store holding every fleet repository
#[derive(Debug, Default)]
pub struct InMemoryFleetStore {
    drones: InMemoryDroneRepository,
    deliveries: InMemoryDeliveryRepository,
    events: InMemoryEventRepository,
}

impl InMemoryFleetStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a fleet
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::WriteConflict`] on duplicate drone IDs,
    /// serial numbers, or delivery IDs.
    pub async fn with_fleet(fleet: FleetFile) -> Result<Self> {
        let store = Self::new();
        for drone in &fleet.drones {
            store.drones.insert(drone).await?;
        }
        for delivery in &fleet.deliveries {
            store.deliveries.insert(delivery).await?;
        }
        tracing::debug!(
            drones = fleet.drones.len(),
            deliveries = fleet.deliveries.len(),
            "Seeded in-memory fleet store"
        );
        Ok(store)
    }

    /// Read a JSON fleet file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn read_fleet_file(path: impl AsRef<Path>) -> Result<FleetFile> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Snapshot of everything currently stored
    ///
    /// # Errors
    ///
    /// Propagates repository read failures.
    pub async fn export(&self) -> Result<FleetFile> {
        Ok(FleetFile {
            drones: self.drones.get_all().await?,
            deliveries: self.deliveries.get_all().await?,
        })
    }

    /// Write the current fleet to a pretty-printed JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let fleet = self.export().await?;
        let json = serde_json::to_vec_pretty(&fleet)?;
        tokio::fs::write(path.as_ref(), json).await?;
        tracing::info!(path = %path.as_ref().display(), "Fleet state written");
        Ok(())
    }
}

impl FleetStore for InMemoryFleetStore {
    type Drones = InMemoryDroneRepository;
    type Deliveries = InMemoryDeliveryRepository;
    type Events = InMemoryEventRepository;

    fn drones(&self) -> &Self::Drones {
        &self.drones
    }

    fn deliveries(&self) -> &Self::Deliveries {
        &self.deliveries
    }

    fn events(&self) -> &Self::Events {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fake::Fake;
    use fake::faker::name::en::Name;
    use fleet_domain::{DeliveryPriority, DroneStatus, Point};
    use tokio_test::assert_ok;

    fn drone(serial: &str) -> Drone {
        let name: String = Name().fake();
        Drone::new(name, "Quad-X", serial, 5.0, 1.0)
    }

    fn delivery(x: f64, y: f64) -> Delivery {
        let customer: String = Name().fake();
        Delivery::new(
            customer,
            Point::new(x, y),
            1.0,
            DeliveryPriority::Medium,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_preserves_order() {
        let store = InMemoryFleetStore::new();
        let first = delivery(1.0, 1.0);
        let second = delivery(2.0, 2.0);
        assert_ok!(store.deliveries().insert(&first).await);
        assert_ok!(store.deliveries().insert(&second).await);

        let all = store.deliveries().get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].delivery_id, first.delivery_id);
        assert_eq!(all[1].delivery_id, second.delivery_id);
    }

    #[tokio::test]
    async fn test_duplicate_serial_rejected() {
        let store = InMemoryFleetStore::new();
        assert_ok!(store.drones().insert(&drone("SN-1")).await);
        let err = store.drones().insert(&drone("SN-1")).await.unwrap_err();
        assert!(matches!(err, PersistenceError::WriteConflict(_)));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = InMemoryFleetStore::new();
        let err = store.drones().update(&drone("SN-2")).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_where_filters() {
        let store = InMemoryFleetStore::new();
        let mut busy = drone("SN-3");
        busy.status = DroneStatus::Maintenance;
        assert_ok!(store.drones().insert(&busy).await);
        assert_ok!(store.drones().insert(&drone("SN-4")).await);

        let available = store
            .drones()
            .get_where(&|d: &Drone| d.status == DroneStatus::Available)
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].serial_number, "SN-4");
    }

    #[tokio::test]
    async fn test_in_progress_lookup() {
        let store = InMemoryFleetStore::new();
        let carrier = drone("SN-5");
        let mut active = delivery(3.0, 4.0);
        active.status = DeliveryStatus::InProgress;
        active.assigned_drone_id = Some(carrier.drone_id);
        assert_ok!(store.deliveries().insert(&delivery(1.0, 1.0)).await);
        assert_ok!(store.deliveries().insert(&active).await);

        let found = store
            .deliveries()
            .get_in_progress_for(carrier.drone_id)
            .await
            .unwrap();
        assert_eq!(found.map(|d| d.delivery_id), Some(active.delivery_id));
    }

    #[tokio::test]
    async fn test_event_feed_is_bounded_and_newest_first() {
        let events = InMemoryEventRepository::with_capacity(2);
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            let event = FleetEvent::ChargingFinished {
                drone_id: *id,
                at: Utc::now(),
            };
            assert_ok!(events.append(&event).await);
        }

        let recent = events.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].drone_id(), ids[2]);
        assert_eq!(recent[1].drone_id(), ids[1]);
    }

    #[tokio::test]
    async fn test_fleet_file_round_trip_through_disk() {
        let fleet = FleetFile {
            drones: vec![drone("SN-6")],
            deliveries: vec![delivery(5.0, 5.0)],
        };
        let store = InMemoryFleetStore::with_fleet(fleet.clone()).await.unwrap();

        let path = std::env::temp_dir().join(format!("fleet-{}.json", Uuid::new_v4()));
        assert_ok!(store.save_to(&path).await);
        let loaded = InMemoryFleetStore::read_fleet_file(&path).await.unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, fleet);
    }

    #[test]
    fn test_fleet_file_validation() {
        let mut bad = delivery(1.0, 1.0);
        bad.status = DeliveryStatus::InProgress;
        let fleet = FleetFile {
            drones: vec![drone("SN-7")],
            deliveries: vec![bad],
        };
        assert!(matches!(
            fleet.validate(0.5),
            Err(PersistenceError::InvalidRecord(_))
        ));
    }
}
