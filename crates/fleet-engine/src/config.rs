//! # Engine Configuration
//!
//! Environment-based configuration for the allocation/movement policy and
//! the tick scheduler. Every policy constant lives here with one default.

use std::env;
use std::time::Duration;

use fleet_domain::FULL_BATTERY;

use crate::error::{EngineError, Result};

/// Wall-clock time between ticks
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 3_000;

/// Distance below which a drone counts as arrived
pub const DEFAULT_ARRIVAL_EPSILON: f64 = 0.5;

/// Battery percent restored per tick at base
pub const DEFAULT_CHARGE_INCREMENT: f64 = 5.0;

/// Battery percent consumed per unit distance
pub const DEFAULT_CONSUMPTION_RATE: f64 = 1.0;

/// Minimum battery for a drone still on the charger to take new work
pub const DEFAULT_CHARGING_DISPATCH_FLOOR: f64 = 30.0;

/// Ticks between fleet metrics log lines
pub const DEFAULT_METRICS_EVERY_TICKS: u64 = 20;

/// Allocation and movement policy
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    pub arrival_epsilon: f64,
    pub charge_increment: f64,
    pub consumption_rate: f64,
    /// `None` admits charging drones regardless of battery
    pub charging_dispatch_floor: Option<f64>,
}

impl PolicyConfig {
    /// Battery needed to travel `distance` units
    #[must_use]
    pub fn battery_for(&self, distance: f64) -> f64 {
        distance * self.consumption_rate
    }

    /// Reject non-finite or out-of-range parameters
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] naming the offending parameter.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("arrival_epsilon", self.arrival_epsilon),
            ("charge_increment", self.charge_increment),
            ("consumption_rate", self.consumption_rate),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if let Some(floor) = self.charging_dispatch_floor {
            if !(0.0..=FULL_BATTERY).contains(&floor) {
                return Err(EngineError::InvalidConfig(format!(
                    "charging_dispatch_floor must be within 0..=100, got {floor}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            arrival_epsilon: DEFAULT_ARRIVAL_EPSILON,
            charge_increment: DEFAULT_CHARGE_INCREMENT,
            consumption_rate: DEFAULT_CONSUMPTION_RATE,
            charging_dispatch_floor: Some(DEFAULT_CHARGING_DISPATCH_FLOOR),
        }
    }
}

/// Tick scheduler settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,

    /// Log fleet metrics every N ticks; 0 disables
    pub metrics_every_ticks: u64,

    /// Stop after this many ticks; `None` runs until cancelled
    pub max_ticks: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            metrics_every_ticks: DEFAULT_METRICS_EVERY_TICKS,
            max_ticks: None,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub policy: PolicyConfig,
    pub scheduler: SchedulerConfig,

    /// Logging level used when `RUST_LOG` is unset
    pub log_level: String,

    /// Emit JSON log lines
    pub log_json: bool,
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    ///
    /// Missing or unparsable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str, default: f64| -> f64 {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        let charging_dispatch_floor = match lookup("CHARGING_DISPATCH_FLOOR") {
            Some(v) if matches!(v.trim().to_ascii_lowercase().as_str(), "none" | "off" | "") => {
                None
            }
            Some(v) => Some(
                v.trim()
                    .parse()
                    .unwrap_or(DEFAULT_CHARGING_DISPATCH_FLOOR),
            ),
            None => Some(DEFAULT_CHARGING_DISPATCH_FLOOR),
        };

        Self {
            policy: PolicyConfig {
                arrival_epsilon: number("ARRIVAL_EPSILON", DEFAULT_ARRIVAL_EPSILON),
                charge_increment: number("CHARGE_INCREMENT", DEFAULT_CHARGE_INCREMENT),
                consumption_rate: number("CONSUMPTION_RATE", DEFAULT_CONSUMPTION_RATE),
                charging_dispatch_floor,
            },

            scheduler: SchedulerConfig {
                tick_interval: Duration::from_millis(
                    lookup("TICK_INTERVAL_MS")
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(DEFAULT_TICK_INTERVAL_MS),
                ),
                metrics_every_ticks: lookup("METRICS_EVERY_TICKS")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_METRICS_EVERY_TICKS),
                max_ticks: None,
            },

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            log_json: lookup("LOG_JSON")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Validate policy and scheduler settings
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;
        if self.scheduler.tick_interval.is_zero() {
            return Err(EngineError::InvalidConfig(
                "tick interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.policy, PolicyConfig::default());
        assert_eq!(config.scheduler.tick_interval, Duration::from_secs(3));
        assert_eq!(config.policy.charging_dispatch_floor, Some(30.0));
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("TICK_INTERVAL_MS", "5000"),
            ("ARRIVAL_EPSILON", "0.1"),
            ("CHARGING_DISPATCH_FLOOR", "none"),
            ("LOG_JSON", "1"),
        ]));
        assert_eq!(config.scheduler.tick_interval, Duration::from_secs(5));
        assert!((config.policy.arrival_epsilon - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.policy.charging_dispatch_floor, None);
        assert!(config.log_json);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("CHARGE_INCREMENT", "lots"),
            ("TICK_INTERVAL_MS", "-3"),
        ]));
        assert!((config.policy.charge_increment - DEFAULT_CHARGE_INCREMENT).abs() < f64::EPSILON);
        assert_eq!(
            config.scheduler.tick_interval,
            Duration::from_millis(DEFAULT_TICK_INTERVAL_MS)
        );
    }

    #[test]
    fn test_validate_rejects_bad_policy() {
        let mut policy = PolicyConfig {
            consumption_rate: f64::NAN,
            ..PolicyConfig::default()
        };
        assert!(matches!(policy.validate(), Err(EngineError::InvalidConfig(_))));

        policy.consumption_rate = 1.0;
        policy.charging_dispatch_floor = Some(150.0);
        assert!(policy.validate().is_err());

        let mut config = EngineConfig::default();
        config.scheduler.tick_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
