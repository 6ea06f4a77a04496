//! Delivery allocation.
//!
//! Pending deliveries are matched to eligible drones in priority order
//! (High, Medium, Low; intake order within a priority). Each delivery gets
//! the feasible drone with the most battery, ties going to the larger
//! payload capacity. A drone picked once is out of the pool for the rest of
//! the pass.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use fleet_domain::{
    BASE, Delivery, DeliveryPriority, DeliveryStatus, Drone, DroneStatus,
};

use crate::config::PolicyConfig;
use crate::snapshot::FleetSnapshot;

/// One delivery matched to one drone, with both records already updated.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub delivery: Delivery,
    pub drone: Drone,
    pub previous_status: DroneStatus,
}

impl Assignment {
    fn new(delivery: &Delivery, drone: &Drone) -> Self {
        let mut delivery = delivery.clone();
        delivery.status = DeliveryStatus::InProgress;
        delivery.assigned_drone_id = Some(drone.drone_id);

        let previous_status = drone.status;
        let mut drone = drone.clone();
        drone.target = Some(delivery.position);
        drone.status = DroneStatus::InUse;
        drone.is_charging = false;

        Self {
            delivery,
            drone,
            previous_status,
        }
    }
}

/// Outcome of planning one allocation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationPlan {
    pub assignments: Vec<Assignment>,
    /// Pending deliveries left for the next tick
    pub unassigned: Vec<Uuid>,
}

impl AllocationPlan {
    pub fn allocated(&self) -> usize {
        self.assignments.len()
    }
}

/// Plan assignments for every pending delivery in `snapshot`.
pub fn plan_allocation(snapshot: &FleetSnapshot, policy: &PolicyConfig) -> AllocationPlan {
    let pool: Vec<&Drone> = snapshot
        .drones
        .iter()
        .filter(|d| is_eligible(d, policy))
        .collect();
    let mut assigned: HashSet<Uuid> = HashSet::with_capacity(pool.len());
    let mut plan = AllocationPlan::default();

    for delivery in prioritize(&snapshot.deliveries) {
        match select_drone(delivery, &pool, &assigned, policy) {
            Some(drone) => {
                assigned.insert(drone.drone_id);
                plan.assignments.push(Assignment::new(delivery, drone));
            }
            None => {
                debug!(
                    delivery_id = %delivery.delivery_id,
                    priority = %delivery.priority,
                    weight_kg = delivery.weight_kg,
                    "No feasible drone for delivery"
                );
                plan.unassigned.push(delivery.delivery_id);
            }
        }
    }

    plan
}

/// Pending deliveries in processing order: High, then Medium, then Low,
/// each bucket keeping its input order.
pub fn prioritize(deliveries: &[Delivery]) -> Vec<&Delivery> {
    DeliveryPriority::ORDERED
        .iter()
        .flat_map(|priority| {
            deliveries
                .iter()
                .filter(move |d| d.status == DeliveryStatus::Pending && d.priority == *priority)
        })
        .collect()
}

/// Whether a drone may take new work this pass.
pub fn is_eligible(drone: &Drone, policy: &PolicyConfig) -> bool {
    if drone.status != DroneStatus::Available {
        return false;
    }
    if !drone.is_charging {
        return true;
    }
    policy
        .charging_dispatch_floor
        .is_none_or(|floor| drone.current_battery >= floor)
}

/// Battery needed to fly to the delivery and then back to base.
pub fn required_battery(drone: &Drone, delivery: &Delivery, policy: &PolicyConfig) -> f64 {
    let outbound = drone.position.distance_to(&delivery.position);
    let home = delivery.position.distance_to(&BASE);
    policy.battery_for(outbound + home)
}

/// Capacity and round-trip battery check. Any `NaN` input is infeasible.
pub fn is_feasible(drone: &Drone, delivery: &Delivery, policy: &PolicyConfig) -> bool {
    if drone.max_weight_kg.is_nan()
        || delivery.weight_kg.is_nan()
        || drone.max_weight_kg < delivery.weight_kg
    {
        return false;
    }
    let required = required_battery(drone, delivery, policy);
    !required.is_nan() && drone.current_battery >= required
}

fn select_drone<'a>(
    delivery: &Delivery,
    pool: &[&'a Drone],
    assigned: &HashSet<Uuid>,
    policy: &PolicyConfig,
) -> Option<&'a Drone> {
    pool.iter()
        .copied()
        .filter(|d| !assigned.contains(&d.drone_id) && is_feasible(d, delivery, policy))
        .fold(None, |best: Option<&Drone>, candidate| match best {
            Some(current) if rank(candidate, current) != Ordering::Greater => Some(current),
            _ => Some(candidate),
        })
}

/// Higher battery wins, then higher capacity.
fn rank(a: &Drone, b: &Drone) -> Ordering {
    a.current_battery
        .total_cmp(&b.current_battery)
        .then(a.max_weight_kg.total_cmp(&b.max_weight_kg))
}
