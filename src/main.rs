mod config;
mod fleet;
mod geo;
mod store;
mod tracker;
mod types;

use chrono::Local;
use config::Config;
use env_logger::Env;
use failure::Error;
use log::{error, info};
use serde_json::Value;
use std::process;
use tracker::VehicleTracker;

#[macro_use]
extern crate failure;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting vehicle-tracker");

    if let Err(e) = run().await {
        error!("Poll cycle failed: {}", e);
        process::exit(1);
    }
    info!("Exiting main");
}

async fn run() -> Result<(), Error> {
    let config = Config::from_env()?;
    let vehicles = fleet::fetch_available_vehicles(&config).await?;

    let mut tracker = VehicleTracker::new();
    tracker.load_existing_data(&store::load(&config.output_path).unwrap_or(Value::Null));

    let mut snapshot = tracker.process_vehicle_data(&vehicles)?;
    if config.max_age_hours > 0 {
        let removed = tracker.cleanup_old_vehicles(config.max_age_hours);
        if removed > 0 {
            info!(
                "Removed {} vehicles not updated in {}h",
                removed, config.max_age_hours
            );
            snapshot = tracker.snapshot(snapshot.timestamp);
        }
    }
    snapshot.last_update = Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
    store::save(&config.output_path, &snapshot)?;

    let stats = tracker.statistics();
    info!(
        "Tracking {} vehicles, {} with movements, {} movements recorded",
        stats.total_vehicles, stats.vehicles_with_movements, stats.total_movements
    );
    Ok(())
}
