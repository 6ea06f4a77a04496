//! Drone movement and charging.
//!
//! One pass advances every in-flight drone a single step toward its target
//! and tops up drones charging at base. Arrival is a snap: when the target is
//! within one step the drone lands exactly on it.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use fleet_domain::{
    BASE, Delivery, DeliveryStatus, Drone, DroneStatus, FULL_BATTERY, FleetEvent,
};

use crate::config::PolicyConfig;
use crate::snapshot::FleetSnapshot;

/// Updated records for one drone touched by the pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DroneStep {
    pub drone: Drone,
    /// Delivery completed on this step, if any
    pub delivery: Option<Delivery>,
    pub events: Vec<FleetEvent>,
}

impl DroneStep {
    fn new(drone: Drone) -> Self {
        Self {
            drone,
            delivery: None,
            events: Vec::new(),
        }
    }

    fn change_status(&mut self, to: DroneStatus, at: DateTime<Utc>) {
        let from = self.drone.status;
        self.drone.status = to;
        self.events.push(FleetEvent::DroneStatusChanged {
            drone_id: self.drone.drone_id,
            from,
            to,
            at,
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementPlan {
    pub steps: Vec<DroneStep>,
}

impl MovementPlan {
    /// Drones touched by the pass
    pub fn moved(&self) -> usize {
        self.steps.len()
    }
}

/// Plan one movement step for every drone in `snapshot`.
pub fn plan_movement(
    snapshot: &FleetSnapshot,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> MovementPlan {
    let steps = snapshot
        .drones
        .iter()
        .filter_map(|drone| match drone.status {
            DroneStatus::InUse | DroneStatus::ReturningToBase => {
                let delivery = current_delivery(snapshot, drone);
                fly(drone, delivery, policy, now)
            }
            DroneStatus::Available
                if drone.is_charging && drone.is_at_base(policy.arrival_epsilon) =>
            {
                Some(charge(drone, policy, now))
            }
            _ => None,
        })
        .collect();

    MovementPlan { steps }
}

/// The in-progress delivery assigned to `drone`
fn current_delivery<'a>(snapshot: &'a FleetSnapshot, drone: &Drone) -> Option<&'a Delivery> {
    snapshot.deliveries.iter().find(|d| {
        d.status == DeliveryStatus::InProgress && d.assigned_drone_id == Some(drone.drone_id)
    })
}

fn fly(
    drone: &Drone,
    delivery: Option<&Delivery>,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> Option<DroneStep> {
    let target = match (drone.target, drone.status) {
        (Some(target), _) => target,
        (None, DroneStatus::InUse) => delivery.map_or(BASE, |d| d.position),
        (None, _) => BASE,
    };

    let remaining = drone.position.distance_to(&target);
    if !remaining.is_finite() || !drone.speed.is_finite() || drone.speed < 0.0 {
        warn!(
            drone_id = %drone.drone_id,
            position = %drone.position,
            target = %target,
            speed = drone.speed,
            "Skipping drone with invalid movement"
        );
        return None;
    }

    let travelled = remaining.min(drone.speed);
    let arrived = remaining <= drone.speed;

    let mut next = drone.clone();
    next.position = if arrived {
        target
    } else {
        drone.position.step_toward(&target, remaining, drone.speed)
    };
    next.current_battery = (drone.current_battery - policy.battery_for(travelled)).max(0.0);
    next.target = Some(target);
    next.last_movement_at = Some(now);

    let mut step = DroneStep::new(next);
    if arrived {
        match drone.status {
            DroneStatus::InUse => arrive_at_delivery(&mut step, delivery, policy, now),
            _ => arrive_at_base(&mut step, policy, now),
        }
    }

    debug!(
        drone_id = %step.drone.drone_id,
        position = %step.drone.position,
        battery = step.drone.current_battery,
        status = %step.drone.status,
        "Drone moved"
    );
    Some(step)
}

fn arrive_at_delivery(
    step: &mut DroneStep,
    delivery: Option<&Delivery>,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) {
    let Some(delivery) = delivery else {
        warn!(
            drone_id = %step.drone.drone_id,
            "Drone in use without an in-progress delivery; returning to base"
        );
        step.drone.target = Some(BASE);
        step.change_status(DroneStatus::ReturningToBase, now);
        return;
    };

    if !step
        .drone
        .position
        .is_within(&delivery.position, policy.arrival_epsilon)
    {
        debug!(
            drone_id = %step.drone.drone_id,
            delivery_id = %delivery.delivery_id,
            "Target does not match delivery; retargeting"
        );
        step.drone.target = Some(delivery.position);
        return;
    }

    let mut done = delivery.clone();
    done.status = DeliveryStatus::Delivered;
    done.delivered_at = Some(now);

    step.events.push(FleetEvent::DeliveryCompleted {
        delivery_id: done.delivery_id,
        drone_id: step.drone.drone_id,
        at: now,
    });
    step.drone.target = Some(BASE);
    step.change_status(DroneStatus::ReturningToBase, now);
    step.delivery = Some(done);
}

fn arrive_at_base(step: &mut DroneStep, policy: &PolicyConfig, now: DateTime<Utc>) {
    if step.drone.is_at_base(policy.arrival_epsilon) {
        step.drone.target = None;
        step.drone.is_charging = true;
        step.change_status(DroneStatus::Available, now);
    } else {
        step.drone.target = Some(BASE);
    }
}

fn charge(drone: &Drone, policy: &PolicyConfig, now: DateTime<Utc>) -> DroneStep {
    let mut step = DroneStep::new(drone.clone());
    if drone.current_battery < FULL_BATTERY {
        step.drone.current_battery =
            (drone.current_battery + policy.charge_increment).min(FULL_BATTERY);
    } else {
        step.drone.is_charging = false;
        step.events.push(FleetEvent::ChargingFinished {
            drone_id: drone.drone_id,
            at: now,
        });
    }
    step
}
