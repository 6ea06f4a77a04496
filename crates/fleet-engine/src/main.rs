//! Fleet Engine CLI
//!
//! Runs the allocation and movement scheduler over a fleet loaded from a
//! JSON file or generated at random.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fleet_domain::{Delivery, DeliveryPriority, Drone, Point};
use fleet_engine::{EngineConfig, FleetEngine, TickScheduler, record_events};
use fleet_persistence::{FleetFile, InMemoryFleetStore};

const DRONE_MODELS: [&str; 3] = ["Quad-X", "Hexa-L", "Wing-S"];
const CUSTOMERS: [&str; 8] = [
    "Harbor Pharmacy",
    "Northside Clinic",
    "Maple Street Bakery",
    "Riverside Books",
    "Summit Outfitters",
    "Oak Lane Florist",
    "Canal Hardware",
    "Lakeview Deli",
];

#[derive(Parser, Debug)]
#[command(name = "fleet-engine")]
#[command(about = "Allocate and fly delivery drones on a fixed tick")]
struct Args {
    /// Fleet JSON file to load instead of a random demo fleet
    #[arg(short, long)]
    fleet_file: Option<PathBuf>,

    /// Drones in the demo fleet
    #[arg(short, long, default_value = "4")]
    drones: usize,

    /// Deliveries in the demo fleet
    #[arg(long, default_value = "12")]
    deliveries: usize,

    /// Seed for the demo fleet
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many ticks
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Tick interval in milliseconds (overrides TICK_INTERVAL_MS)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Write the final fleet state to this JSON file
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Emit JSON log lines (overrides LOG_JSON)
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = EngineConfig::from_env();
    if let Some(ms) = args.tick_ms {
        config.scheduler.tick_interval = Duration::from_millis(ms);
    }
    config.scheduler.max_ticks = args.ticks;
    config.log_json |= args.json_logs;
    config.validate()?;

    init_tracing(&config);

    info!(
        version = fleet_engine::VERSION,
        policy = ?config.policy,
        "Starting fleet engine"
    );

    let fleet = match &args.fleet_file {
        Some(path) => {
            let fleet = InMemoryFleetStore::read_fleet_file(path)
                .await
                .with_context(|| format!("reading fleet file {}", path.display()))?;
            fleet.validate(config.policy.arrival_epsilon)?;
            fleet
        }
        None => demo_fleet(args.drones, args.deliveries, args.seed),
    };
    info!(
        drones = fleet.drones.len(),
        deliveries = fleet.deliveries.len(),
        "Fleet loaded"
    );

    let store = Arc::new(InMemoryFleetStore::with_fleet(fleet).await?);
    let engine = Arc::new(FleetEngine::new(store.clone(), config.policy.clone()));
    let recorder = tokio::spawn(record_events(store.clone(), engine.subscribe()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let scheduler = TickScheduler::new(engine.clone(), config.scheduler.clone());
    let report = scheduler.run(shutdown_rx).await;

    let metrics = engine.metrics().await?;
    info!(report = %report, metrics = %metrics, "Fleet engine finished");
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    // Closing the event channel lets the recorder drain and exit
    drop(scheduler);
    drop(engine);
    recorder.await?;

    if let Some(path) = &args.dump {
        store
            .save_to(path)
            .await
            .with_context(|| format!("writing fleet dump {}", path.display()))?;
    }

    Ok(())
}

fn init_tracing(config: &EngineConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Random fleet idling at base with pending deliveries scattered around it.
fn demo_fleet(drones: usize, deliveries: usize, seed: Option<u64>) -> FleetFile {
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let now = Utc::now();

    let drones = (0..drones)
        .map(|i| {
            let model = DRONE_MODELS.choose(&mut rng).copied().unwrap_or("Quad-X");
            let mut drone = Drone::new(
                format!("Drone-{:02}", i + 1),
                model,
                format!("SN-{}-{:04}", &model[..1], i + 1),
                rng.gen_range(2.0..10.0),
                rng.gen_range(0.8..2.5),
            );
            drone.current_battery = rng.gen_range(40.0..=100.0);
            drone
        })
        .collect();

    let deliveries = (0..deliveries)
        .map(|_| {
            let customer = CUSTOMERS.choose(&mut rng).copied().unwrap_or("Walk-in");
            let priority = DeliveryPriority::ORDERED
                .choose(&mut rng)
                .copied()
                .unwrap_or(DeliveryPriority::Medium);
            Delivery::new(
                customer,
                Point::new(rng.gen_range(-15.0..15.0), rng.gen_range(-15.0..15.0)),
                rng.gen_range(0.2..6.0),
                priority,
                now,
            )
        })
        .collect();

    FleetFile { drones, deliveries }
}

/// Resolves on Ctrl+C or SIGTERM. A handler that fails to install never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
