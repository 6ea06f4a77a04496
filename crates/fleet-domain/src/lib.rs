//! # Delivery Fleet - Domain Model
//!
//! Core entities, value objects, and enums for the drone delivery fleet.
//! These types are shared by the persistence layer and the
//! allocation/movement engine.
//!
//! All positions live on a flat 2D plane measured in abstract distance
//! units. The base is the fixed origin where drones return and charge.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Fixed base location shared by the whole fleet
pub const BASE: Point = Point::new(0.0, 0.0);

/// Battery level of a fully charged drone, in percent
pub const FULL_BATTERY: f64 = 100.0;

// =============================================================================
// GEOMETRY
// =============================================================================

/// Euclidean distance between `(x1, y1)` and `(x2, y2)`.
///
/// Inputs are not validated. Very large magnitudes overflow to infinity and
/// any `NaN` coordinate yields `NaN`; callers bound their own inputs.
#[must_use]
pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// A position on the delivery plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_to(&self, other: &Point) -> f64 {
        distance(self.x, self.y, other.x, other.y)
    }

    /// True when `other` lies within `epsilon` of this point
    #[must_use]
    pub fn is_within(&self, other: &Point, epsilon: f64) -> bool {
        self.distance_to(other) <= epsilon
    }

    /// Step `step` units from this point toward `target`.
    ///
    /// `total` is the precomputed distance to `target` and must be non-zero.
    #[must_use]
    pub fn step_toward(&self, target: &Point, total: f64, step: f64) -> Point {
        let dir_x = (target.x - self.x) / total;
        let dir_y = (target.y - self.y) / total;
        Point::new(self.x + dir_x * step, self.y + dir_y * step)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// =============================================================================
// ENUMS
// =============================================================================

/// Drone operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroneStatus {
    Available,
    InUse,
    ReturningToBase,
    Maintenance,
    Offline,
}

impl DroneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::InUse => "IN_USE",
            Self::ReturningToBase => "RETURNING_TO_BASE",
            Self::Maintenance => "MAINTENANCE",
            Self::Offline => "OFFLINE",
        }
    }

    /// In flight toward a delivery or back to base
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InUse | Self::ReturningToBase)
    }
}

impl fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    InProgress,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery priority, processed High first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryPriority {
    High,
    Medium,
    Low,
}

impl DeliveryPriority {
    /// Processing order for allocation
    pub const ORDERED: [DeliveryPriority; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for DeliveryPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// Drone entity - a single delivery drone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    pub drone_id: Uuid,

    // Identification
    pub name: String,
    pub model: String,
    pub serial_number: String,

    // Capability
    pub max_weight_kg: f64,
    /// Distance units covered per tick
    pub speed: f64,

    // Current state
    pub status: DroneStatus,
    pub current_battery: f64,
    pub is_charging: bool,
    pub position: Point,
    /// Movement target; `None` while idle
    pub target: Option<Point>,
    pub last_movement_at: Option<DateTime<Utc>>,
}

impl Drone {
    /// New drone, fully charged and idle at base
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        serial_number: impl Into<String>,
        max_weight_kg: f64,
        speed: f64,
    ) -> Self {
        Self {
            drone_id: Uuid::new_v4(),
            name: name.into(),
            model: model.into(),
            serial_number: serial_number.into(),
            max_weight_kg,
            speed,
            status: DroneStatus::Available,
            current_battery: FULL_BATTERY,
            is_charging: false,
            position: BASE,
            target: None,
            last_movement_at: None,
        }
    }

    #[must_use]
    pub fn is_at_base(&self, epsilon: f64) -> bool {
        self.position.is_within(&BASE, epsilon)
    }

    /// Check the invariants an externally created drone must satisfy
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] for an out-of-range battery, a negative or
    /// non-finite speed or capacity, an in-flight drone without a target, or
    /// a drone charging away from base.
    pub fn validate(&self, base_epsilon: f64) -> Result<(), DomainError> {
        if !(0.0..=FULL_BATTERY).contains(&self.current_battery) {
            return Err(DomainError::InvalidBattery {
                drone_id: self.drone_id,
                battery: self.current_battery,
            });
        }
        for (field, value) in [("speed", self.speed), ("max_weight_kg", self.max_weight_kg)] {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::InvalidDroneState {
                    drone_id: self.drone_id,
                    reason: format!("{field} must be finite and non-negative, got {value}"),
                });
            }
        }
        if self.status.is_in_flight() && self.target.is_none() {
            return Err(DomainError::InvalidDroneState {
                drone_id: self.drone_id,
                reason: format!("{} without a movement target", self.status),
            });
        }
        if self.is_charging
            && (self.status != DroneStatus::Available || !self.is_at_base(base_epsilon))
        {
            return Err(DomainError::InvalidDroneState {
                drone_id: self.drone_id,
                reason: "charging away from base or while not available".to_string(),
            });
        }
        Ok(())
    }
}

/// Delivery entity - a customer drop-off request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub delivery_id: Uuid,
    pub customer_name: String,

    pub position: Point,
    pub weight_kg: f64,
    pub priority: DeliveryPriority,
    pub status: DeliveryStatus,

    /// Kept after delivery or cancellation as assignment history
    pub assigned_drone_id: Option<Uuid>,

    // Temporal
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Delivery {
    /// New pending delivery
    pub fn new(
        customer_name: impl Into<String>,
        position: Point,
        weight_kg: f64,
        priority: DeliveryPriority,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            delivery_id: Uuid::new_v4(),
            customer_name: customer_name.into(),
            position,
            weight_kg,
            priority,
            status: DeliveryStatus::Pending,
            assigned_drone_id: None,
            created_at,
            delivered_at: None,
        }
    }

    /// Time from intake to drop-off, once delivered
    #[must_use]
    pub fn delivery_time(&self) -> Option<chrono::Duration> {
        self.delivered_at.map(|at| at - self.created_at)
    }
}

// =============================================================================
// DOMAIN EVENTS
// =============================================================================

/// Events emitted by the engine for collaborators to log or expose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FleetEvent {
    DeliveryAllocated {
        delivery_id: Uuid,
        drone_id: Uuid,
        priority: DeliveryPriority,
        at: DateTime<Utc>,
    },
    DeliveryCompleted {
        delivery_id: Uuid,
        drone_id: Uuid,
        at: DateTime<Utc>,
    },
    DroneStatusChanged {
        drone_id: Uuid,
        from: DroneStatus,
        to: DroneStatus,
        at: DateTime<Utc>,
    },
    ChargingFinished {
        drone_id: Uuid,
        at: DateTime<Utc>,
    },
}

impl FleetEvent {
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::DeliveryAllocated { at, .. }
            | Self::DeliveryCompleted { at, .. }
            | Self::DroneStatusChanged { at, .. }
            | Self::ChargingFinished { at, .. } => *at,
        }
    }

    /// Drone the event concerns
    #[must_use]
    pub fn drone_id(&self) -> Uuid {
        match self {
            Self::DeliveryAllocated { drone_id, .. }
            | Self::DeliveryCompleted { drone_id, .. }
            | Self::DroneStatusChanged { drone_id, .. }
            | Self::ChargingFinished { drone_id, .. } => *drone_id,
        }
    }

    /// Short human-readable title for activity feeds
    pub fn title(&self) -> &'static str {
        match self {
            Self::DeliveryAllocated { .. } => "Drone allocated",
            Self::DeliveryCompleted { .. } => "Delivery completed",
            Self::DroneStatusChanged { .. } => "Drone status changed",
            Self::ChargingFinished { .. } => "Charging finished",
        }
    }
}

impl fmt::Display for FleetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeliveryAllocated {
                delivery_id,
                drone_id,
                priority,
                ..
            } => write!(
                f,
                "{priority} delivery {delivery_id} allocated to drone {drone_id}"
            ),
            Self::DeliveryCompleted {
                delivery_id,
                drone_id,
                ..
            } => write!(f, "Delivery {delivery_id} completed by drone {drone_id}"),
            Self::DroneStatusChanged {
                drone_id, from, to, ..
            } => write!(f, "Drone {drone_id} changed from {from} to {to}"),
            Self::ChargingFinished { drone_id, .. } => {
                write!(f, "Drone {drone_id} fully charged")
            }
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid battery level for drone {drone_id}: {battery}")]
    InvalidBattery { drone_id: Uuid, battery: f64 },

    #[error("Invalid state for drone {drone_id}: {reason}")]
    InvalidDroneState { drone_id: Uuid, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::Fake;
    use fake::faker::name::en::Name;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_distance_known_triangles() {
        assert!((distance(0.0, 0.0, 3.0, 4.0) - 5.0).abs() < EPS);
        assert!((distance(1.0, 1.0, 4.0, 5.0) - 5.0).abs() < EPS);
        assert!((distance(-3.0, -4.0, 0.0, 0.0) - 5.0).abs() < EPS);
        assert!((distance(10.0, 10.0, 13.0, 14.0) - 5.0).abs() < EPS);
    }

    #[test]
    fn test_distance_identity_and_symmetry() {
        let points = [(0.0, 0.0), (1.5, -2.0), (-7.25, 3.0), (1e6, -1e6)];
        for &(ax, ay) in &points {
            assert_eq!(distance(ax, ay, ax, ay), 0.0);
            for &(bx, by) in &points {
                assert_eq!(distance(ax, ay, bx, by), distance(bx, by, ax, ay));
            }
        }
    }

    #[test]
    fn test_triangle_inequality() {
        // Collinear: equality
        let ab = distance(0.0, 0.0, 2.0, 2.0);
        let bc = distance(2.0, 2.0, 5.0, 5.0);
        let ac = distance(0.0, 0.0, 5.0, 5.0);
        assert!((ab + bc - ac).abs() < EPS);

        // Non-collinear: strict
        let ab = distance(0.0, 0.0, 3.0, 0.0);
        let bc = distance(3.0, 0.0, 3.0, 4.0);
        let ac = distance(0.0, 0.0, 3.0, 4.0);
        assert!(ab + bc > ac);
    }

    #[test]
    fn test_distance_overflows_to_infinity() {
        assert_eq!(distance(f64::MAX, 0.0, 0.0, 0.0), f64::INFINITY);
        assert_eq!(distance(0.0, f64::MAX, 0.0, 0.0), f64::INFINITY);
        assert_eq!(distance(0.0, 0.0, f64::MAX, 0.0), f64::INFINITY);
        assert_eq!(distance(0.0, 0.0, 0.0, f64::MAX), f64::INFINITY);
    }

    #[test]
    fn test_distance_propagates_nan() {
        assert!(distance(f64::NAN, 0.0, 0.0, 0.0).is_nan());
        assert!(distance(0.0, f64::NAN, 0.0, 0.0).is_nan());
        assert!(distance(0.0, 0.0, f64::NAN, 0.0).is_nan());
        assert!(distance(0.0, 0.0, 0.0, f64::NAN).is_nan());
    }

    #[test]
    fn test_step_toward() {
        let next = BASE.step_toward(&Point::new(3.0, 4.0), 5.0, 1.0);
        assert!((next.x - 0.6).abs() < EPS);
        assert!((next.y - 0.8).abs() < EPS);
    }

    #[test]
    fn test_new_drone_is_idle_at_base() {
        let name: String = Name().fake();
        let drone = Drone::new(name, "Quad-X", "SN-001", 5.0, 1.0);
        assert_eq!(drone.status, DroneStatus::Available);
        assert_eq!(drone.current_battery, FULL_BATTERY);
        assert!(drone.is_at_base(0.5));
        assert!(drone.target.is_none());
        assert!(drone.validate(0.5).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_drones() {
        let mut drone = Drone::new("Falcon", "Quad-X", "SN-002", 5.0, 1.0);
        drone.current_battery = 120.0;
        assert!(matches!(
            drone.validate(0.5),
            Err(DomainError::InvalidBattery { .. })
        ));

        let mut drone = Drone::new("Falcon", "Quad-X", "SN-003", 5.0, 1.0);
        drone.status = DroneStatus::InUse;
        assert!(matches!(
            drone.validate(0.5),
            Err(DomainError::InvalidDroneState { .. })
        ));

        let mut drone = Drone::new("Falcon", "Quad-X", "SN-004", 5.0, 1.0);
        drone.position = Point::new(4.0, 4.0);
        drone.is_charging = true;
        assert!(drone.validate(0.5).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_capability() {
        for speed in [-1.0, f64::NAN, f64::INFINITY] {
            let drone = Drone::new("Falcon", "Quad-X", "SN-005", 5.0, speed);
            assert!(matches!(
                drone.validate(0.5),
                Err(DomainError::InvalidDroneState { .. })
            ));
        }

        let drone = Drone::new("Falcon", "Quad-X", "SN-006", -2.0, 1.0);
        assert!(drone.validate(0.5).is_err());

        let parked = Drone::new("Falcon", "Quad-X", "SN-007", 5.0, 0.0);
        assert!(parked.validate(0.5).is_ok());
    }

    #[test]
    fn test_delivery_time() {
        let created = Utc::now();
        let mut delivery = Delivery::new(
            "Ana",
            Point::new(1.0, 1.0),
            1.0,
            DeliveryPriority::Medium,
            created,
        );
        assert!(delivery.delivery_time().is_none());
        delivery.delivered_at = Some(created + chrono::Duration::seconds(42));
        assert_eq!(delivery.delivery_time(), Some(chrono::Duration::seconds(42)));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = FleetEvent::ChargingFinished {
            drone_id: Uuid::nil(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CHARGING_FINISHED");
        assert_eq!(event.title(), "Charging finished");
    }
}
