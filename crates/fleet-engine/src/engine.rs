//! # Fleet Engine
//!
//! Runs allocation and movement passes against a [`FleetStore`]. Each pass
//! loads a snapshot, plans against it, then writes every changed record back
//! one at a time. A storage failure aborts the pass; records already written
//! stay written.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use fleet_domain::{Delivery, DeliveryStatus, Drone, DroneStatus, FleetEvent};
use fleet_persistence::{DeliveryRepository, DroneRepository, FleetStore};

use crate::allocation::plan_allocation;
use crate::clock::{Clock, SystemClock};
use crate::config::PolicyConfig;
use crate::error::{EngineError, Result};
use crate::events::EventBus;
use crate::metrics::FleetMetrics;
use crate::movement::plan_movement;
use crate::snapshot::FleetSnapshot;

/// Counts from one allocate-then-move tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub allocated: usize,
    pub moved: usize,
}

impl fmt::Display for TickSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Allocated {} deliveries, moved {} drones",
            self.allocated, self.moved
        )
    }
}

/// Allocation and movement service over a fleet store.
///
/// Passes are safe to call out of band (e.g. a manual re-allocation) while
/// the scheduler runs; overlapping passes are last-write-wins per record.
pub struct FleetEngine<S: FleetStore> {
    store: Arc<S>,
    policy: PolicyConfig,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl<S: FleetStore> FleetEngine<S> {
    pub fn new(store: Arc<S>, policy: PolicyConfig) -> Self {
        Self {
            store,
            policy,
            clock: Arc::new(SystemClock),
            events: EventBus::default(),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.events.subscribe()
    }

    /// Match pending deliveries to available drones.
    ///
    /// Returns the number of deliveries allocated.
    ///
    /// # Errors
    ///
    /// Fails on the first repository error; earlier assignments stay persisted.
    pub async fn run_allocation_pass(&self) -> Result<usize> {
        let snapshot = FleetSnapshot::load_where(
            self.store.as_ref(),
            &|d: &Drone| d.status == DroneStatus::Available,
            &|d: &Delivery| d.status == DeliveryStatus::Pending,
        )
        .await?;

        let plan = plan_allocation(&snapshot, &self.policy);
        let now = self.clock.now();

        // Drone before delivery: a half-written assignment leaves the delivery Pending
        for assignment in &plan.assignments {
            self.store.drones().update(&assignment.drone).await?;
            self.store.deliveries().update(&assignment.delivery).await?;

            info!(
                delivery_id = %assignment.delivery.delivery_id,
                drone_id = %assignment.drone.drone_id,
                priority = %assignment.delivery.priority,
                battery = assignment.drone.current_battery,
                "Delivery allocated"
            );

            self.events.publish(FleetEvent::DeliveryAllocated {
                delivery_id: assignment.delivery.delivery_id,
                drone_id: assignment.drone.drone_id,
                priority: assignment.delivery.priority,
                at: now,
            });
            self.events.publish(FleetEvent::DroneStatusChanged {
                drone_id: assignment.drone.drone_id,
                from: assignment.previous_status,
                to: assignment.drone.status,
                at: now,
            });
        }

        if !plan.unassigned.is_empty() {
            debug!(
                waiting = plan.unassigned.len(),
                "Pending deliveries left for a later tick"
            );
        }

        Ok(plan.allocated())
    }

    /// Advance in-flight drones one step and charge drones at base.
    ///
    /// Returns the number of drones touched.
    ///
    /// # Errors
    ///
    /// Fails on the first repository error; earlier steps stay persisted.
    pub async fn run_movement_pass(&self) -> Result<usize> {
        let snapshot = FleetSnapshot::load_where(
            self.store.as_ref(),
            &|d: &Drone| d.status.is_in_flight() || d.is_charging,
            &|d: &Delivery| d.status == DeliveryStatus::InProgress,
        )
        .await?;

        let plan = plan_movement(&snapshot, &self.policy, self.clock.now());

        // Delivery before drone: a half-written arrival leaves the drone InUse
        for step in &plan.steps {
            if let Some(delivery) = &step.delivery {
                self.store.deliveries().update(delivery).await?;
                info!(
                    delivery_id = %delivery.delivery_id,
                    drone_id = %step.drone.drone_id,
                    "Delivery completed"
                );
            }
            self.store.drones().update(&step.drone).await?;

            for event in &step.events {
                self.events.publish(event.clone());
            }
        }

        Ok(plan.moved())
    }

    /// One allocation pass followed by one movement pass.
    ///
    /// # Errors
    ///
    /// Propagates the first failing pass; a failed allocation skips movement.
    /// A failed movement pass returns [`EngineError::MovementFailed`] carrying
    /// the allocations already persisted.
    pub async fn run_tick(&self) -> Result<TickSummary> {
        let allocated = self.run_allocation_pass().await?;
        let moved = self
            .run_movement_pass()
            .await
            .map_err(|source| EngineError::MovementFailed {
                allocated,
                source: Box::new(source),
            })?;
        Ok(TickSummary { allocated, moved })
    }

    /// Metrics over the whole fleet as currently stored.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn metrics(&self) -> Result<FleetMetrics> {
        let snapshot = FleetSnapshot::load(self.store.as_ref()).await?;
        Ok(FleetMetrics::from_snapshot(&snapshot))
    }
}
