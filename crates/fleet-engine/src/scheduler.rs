//! Periodic tick loop.
//!
//! Runs one allocate-then-move tick per interval until shutdown is signalled
//! or the configured tick limit is reached. A failed tick is logged and the
//! next one runs on schedule; there are no retries.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use fleet_persistence::FleetStore;

use crate::config::SchedulerConfig;
use crate::engine::FleetEngine;

/// Observable scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick
    Idle,
    /// Terminal
    Stopped,
}

/// Totals accumulated over a scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub ticks: u64,
    pub failed_ticks: u64,
    pub allocated: usize,
    pub moved: usize,
}

impl fmt::Display for SchedulerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks ({} failed), {} allocations, {} drone moves",
            self.ticks, self.failed_ticks, self.allocated, self.moved
        )
    }
}

pub struct TickScheduler<S: FleetStore> {
    engine: Arc<FleetEngine<S>>,
    config: SchedulerConfig,
    state: watch::Sender<SchedulerState>,
}

impl<S: FleetStore> TickScheduler<S> {
    pub fn new(engine: Arc<FleetEngine<S>>, config: SchedulerConfig) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            engine,
            config,
            state,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Run ticks until `shutdown` turns true, its sender is dropped, or the
    /// tick limit is reached. An in-flight tick always completes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> SchedulerReport {
        info!(
            interval = ?self.config.tick_interval,
            max_ticks = ?self.config.max_ticks,
            "Tick scheduler started"
        );

        let mut report = SchedulerReport::default();

        loop {
            if *shutdown.borrow() {
                info!("Tick scheduler shutting down");
                break;
            }
            if self.limit_reached(report.ticks) {
                break;
            }

            report.ticks += 1;
            self.tick(report.ticks, &mut report).await;

            // No wait after the last allowed tick
            if self.limit_reached(report.ticks) {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.tick_interval) => {}
                _ = shutdown.changed() => {
                    info!("Tick scheduler shutting down (during wait)");
                    break;
                }
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
        info!(report = %report, "Tick scheduler stopped");
        report
    }

    fn limit_reached(&self, ticks: u64) -> bool {
        let reached = self.config.max_ticks.is_some_and(|max| ticks >= max);
        if reached {
            info!(ticks, "Tick limit reached");
        }
        reached
    }

    async fn tick(&self, tick: u64, report: &mut SchedulerReport) {
        match self.engine.run_tick().await {
            Ok(summary) => {
                report.allocated += summary.allocated;
                report.moved += summary.moved;
                info!(
                    tick,
                    allocated = summary.allocated,
                    moved = summary.moved,
                    "{summary}"
                );
            }
            Err(e) => {
                report.failed_ticks += 1;
                report.allocated += e.allocated();
                error!(tick, allocated = e.allocated(), error = %e, "Tick failed");
            }
        }

        let every = self.config.metrics_every_ticks;
        if every > 0 && tick % every == 0 {
            match self.engine.metrics().await {
                Ok(metrics) => info!(tick, %metrics, "Fleet metrics"),
                Err(e) => warn!(tick, error = %e, "Failed to compute fleet metrics"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::PolicyConfig;
    use fleet_persistence::InMemoryFleetStore;

    fn scheduler(interval: Duration, max_ticks: Option<u64>) -> TickScheduler<InMemoryFleetStore> {
        let engine = FleetEngine::new(Arc::new(InMemoryFleetStore::new()), PolicyConfig::default());
        TickScheduler::new(
            Arc::new(engine),
            SchedulerConfig {
                tick_interval: interval,
                metrics_every_ticks: 2,
                max_ticks,
            },
        )
    }

    #[tokio::test]
    async fn test_stops_at_tick_limit() {
        let scheduler = scheduler(Duration::from_millis(1), Some(3));
        let (_tx, rx) = watch::channel(false);

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        let report = scheduler.run(rx).await;

        assert_eq!(report.ticks, 3);
        assert_eq!(report.failed_ticks, 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_tick_limit_skips_final_wait() {
        let scheduler = scheduler(Duration::from_secs(3600), Some(1));
        let (_tx, rx) = watch::channel(false);

        let report = tokio::time::timeout(Duration::from_secs(5), scheduler.run(rx))
            .await
            .unwrap();
        assert_eq!(report.ticks, 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick() {
        let scheduler = scheduler(Duration::from_millis(1), None);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let report = scheduler.run(rx).await;
        assert_eq!(report.ticks, 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_wait() {
        let scheduler = Arc::new(scheduler(Duration::from_secs(3600), None));
        let (tx, rx) = watch::channel(false);
        let mut state = scheduler.watch_state();

        let runner = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run(rx).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let report = tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.ticks, 1);
        assert!(state.has_changed().unwrap());
        assert_eq!(*state.borrow_and_update(), SchedulerState::Stopped);
    }

    #[test]
    fn test_report_display() {
        let report = SchedulerReport {
            ticks: 4,
            failed_ticks: 1,
            allocated: 2,
            moved: 7,
        };
        assert_eq!(report.to_string(), "4 ticks (1 failed), 2 allocations, 7 drone moves");
    }
}
