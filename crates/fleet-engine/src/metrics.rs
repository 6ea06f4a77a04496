//! Fleet-wide delivery metrics.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fleet_domain::{DeliveryStatus, DroneStatus};

use crate::snapshot::FleetSnapshot;

/// Drone with the most completed deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneEfficiency {
    pub drone_id: Uuid,
    pub name: String,
    pub deliveries_completed: usize,
}

/// Drone counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroneStatusCounts {
    pub available: usize,
    pub in_use: usize,
    pub returning_to_base: usize,
    pub maintenance: usize,
    pub offline: usize,
    pub charging: usize,
}

/// Point-in-time delivery performance summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetMetrics {
    pub total_deliveries: usize,
    pub pending_deliveries: usize,
    pub delivered: usize,
    pub cancelled: usize,
    /// Mean `delivered_at - created_at` in seconds; 0 with nothing delivered
    pub average_delivery_time_secs: f64,
    /// Delivered as a percentage of delivered plus cancelled
    pub success_rate_pct: f64,
    pub most_efficient_drone: Option<DroneEfficiency>,
    pub drones: DroneStatusCounts,
}

impl FleetMetrics {
    pub fn from_snapshot(snapshot: &FleetSnapshot) -> Self {
        let mut pending = 0;
        let mut cancelled = 0;
        let mut delivered = 0;
        let mut delivered_secs = Vec::new();
        let mut per_drone: HashMap<Uuid, usize> = HashMap::new();

        for delivery in &snapshot.deliveries {
            match delivery.status {
                DeliveryStatus::Pending => pending += 1,
                DeliveryStatus::Cancelled => cancelled += 1,
                DeliveryStatus::Delivered => {
                    delivered += 1;
                    if let Some(elapsed) = delivery.delivery_time() {
                        delivered_secs.push(elapsed.num_milliseconds() as f64 / 1000.0);
                    }
                    if let Some(drone_id) = delivery.assigned_drone_id {
                        *per_drone.entry(drone_id).or_default() += 1;
                    }
                }
                DeliveryStatus::InProgress => {}
            }
        }

        let average_delivery_time_secs = if delivered_secs.is_empty() {
            0.0
        } else {
            delivered_secs.iter().sum::<f64>() / delivered_secs.len() as f64
        };

        let closed = delivered + cancelled;
        let success_rate_pct = if closed == 0 {
            0.0
        } else {
            delivered as f64 / closed as f64 * 100.0
        };

        // Strictly greater keeps the earliest drone on ties
        let mut most_efficient: Option<DroneEfficiency> = None;
        for drone in &snapshot.drones {
            let count = per_drone.get(&drone.drone_id).copied().unwrap_or(0);
            if count > 0 && most_efficient.as_ref().is_none_or(|m| count > m.deliveries_completed) {
                most_efficient = Some(DroneEfficiency {
                    drone_id: drone.drone_id,
                    name: drone.name.clone(),
                    deliveries_completed: count,
                });
            }
        }

        let mut drones = DroneStatusCounts::default();
        for drone in &snapshot.drones {
            match drone.status {
                DroneStatus::Available => drones.available += 1,
                DroneStatus::InUse => drones.in_use += 1,
                DroneStatus::ReturningToBase => drones.returning_to_base += 1,
                DroneStatus::Maintenance => drones.maintenance += 1,
                DroneStatus::Offline => drones.offline += 1,
            }
            if drone.is_charging {
                drones.charging += 1;
            }
        }

        Self {
            total_deliveries: snapshot.deliveries.len(),
            pending_deliveries: pending,
            delivered,
            cancelled,
            average_delivery_time_secs,
            success_rate_pct,
            most_efficient_drone: most_efficient,
            drones,
        }
    }
}

impl fmt::Display for FleetMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} delivered ({:.1}% success, avg {:.1}s), {} pending, {} drones in flight",
            self.delivered,
            self.total_deliveries,
            self.success_rate_pct,
            self.average_delivery_time_secs,
            self.pending_deliveries,
            self.drones.in_use + self.drones.returning_to_base,
        )
    }
}
