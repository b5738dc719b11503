//! Weather station ingestion and history service.
//!
//! Readings arrive from the station gateway (form upload) or the message bus,
//! are normalized to metric units, published as the latest snapshot with
//! trend annotations, appended to a SQLite time-series log, and rolled up
//! per day for rain. The log is pruned on a retention horizon and queried as
//! minute-bucketed averages for charting.
//!
//! This crate follows the Explicit Module Boundary Pattern (EMBP): modules
//! talk to each other through the names re-exported here, and `main.rs` only
//! calls [`config::load_from_env`], [`build_station`] and [`routes::router`].
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

pub mod config;
pub mod geocode;
pub mod history;
pub mod models;
pub mod mqtt;
pub mod retention;
pub mod routes;
pub mod schema;
pub mod snapshot;
pub mod station;
pub mod storage;
pub mod trend;
pub mod units;

pub use config::{Config, StorageBackend};
pub use models::{DailyRollup, FieldUpdate, GatewayUpload, Metric, Reading};
pub use station::{LatestSnapshot, Payload, Station};

use geocode::{HttpPlaceLookup, PlaceLookup, PlaceResolver};
use retention::RetentionManager;
use storage::{MemorySink, ReadingSink, SqliteSink};

// ---

/// Open the configured sink, creating the schema when it is durable.
pub async fn open_sink(cfg: &Config) -> Result<Arc<dyn ReadingSink>> {
    // ---
    match cfg.storage {
        StorageBackend::Sqlite => {
            tracing::info!("Opening SQLite database");
            let sink = SqliteSink::connect(&cfg.db_url, cfg.db_pool_max).await?;
            schema::create_schema(sink.pool()).await?;
            tracing::info!("Database ready");
            Ok(Arc::new(sink))
        }
        StorageBackend::Memory => {
            tracing::warn!("STORAGE_BACKEND=memory: readings will not survive a restart");
            Ok(Arc::new(MemorySink::new()))
        }
    }
}

/// Wire a [`Station`] from configuration.
pub async fn build_station(cfg: &Config) -> Result<Arc<Station>> {
    // ---
    let sink = open_sink(cfg).await?;
    let retention = RetentionManager::new(cfg.retention_days, cfg.prune_interval_secs);

    let timeout = Duration::from_secs(cfg.geocode_timeout_secs);
    let places = if cfg.geocode_enabled {
        let lookup: Box<dyn PlaceLookup> = Box::new(HttpPlaceLookup::new(timeout)?);
        PlaceResolver::new(
            Some(lookup),
            timeout,
            Duration::from_secs(cfg.geocode_cache_secs),
        )
    } else {
        PlaceResolver::disabled()
    };

    Ok(Arc::new(Station::new(&cfg.location, sink, retention, places)))
}
