//! # Fleet Engine
//!
//! Allocation and movement engine for a delivery drone fleet.
//!
//! ## Features
//!
//! - Priority-ordered allocation of pending deliveries under payload and
//!   round-trip battery constraints
//! - Step-wise drone movement, delivery completion, and charging at base
//! - Periodic tick scheduler with per-tick failure isolation
//! - Nearest-neighbor route ordering for multi-stop planning
//! - Fleet events and delivery metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   run_tick   ┌───────────────┐  load / update  ┌────────────┐
//! │ TickScheduler│─────────────►│  FleetEngine  │────────────────►│ FleetStore │
//! └──────────────┘              └───────┬───────┘                 └────────────┘
//!                                       │ plan_allocation / plan_movement
//!                                       ▼
//!                               ┌───────────────┐      ┌──────────┐
//!                               │ FleetSnapshot │      │ EventBus │
//!                               └───────────────┘      └──────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod allocation;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod movement;
pub mod route;
pub mod scheduler;
pub mod snapshot;

pub use allocation::{AllocationPlan, Assignment, plan_allocation};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, PolicyConfig, SchedulerConfig};
pub use engine::{FleetEngine, TickSummary};
pub use error::{EngineError, Result};
pub use events::{EventBus, record_events};
pub use fleet_domain::distance;
pub use metrics::{DroneEfficiency, DroneStatusCounts, FleetMetrics};
pub use movement::{DroneStep, MovementPlan, plan_movement};
pub use route::{optimal_route, route_distance};
pub use scheduler::{SchedulerReport, SchedulerState, TickScheduler};
pub use snapshot::FleetSnapshot;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
