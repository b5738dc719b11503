//! The station context: one object owning all pipeline state.
//!
//! Producers (the HTTP upload route and the message bus) hand a [`Payload`]
//! to [`Station::ingest`]; query routes call [`Station::latest`],
//! [`Station::history`] and [`Station::daily_rain`]. Nothing here is global;
//! `main.rs` builds one `Station` and shares it behind an `Arc`.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::geocode::PlaceResolver;
use crate::history::{self, History};
use crate::models::{DailyRollup, FieldUpdate, GatewayUpload, Reading};
use crate::retention::RetentionManager;
use crate::snapshot::SnapshotStore;
use crate::storage::ReadingSink;
use crate::trend::TrendMap;
use crate::units::CompassRose;

pub const MAX_RAIN_DAYS: u32 = 366;

/// Rain totals on the latest snapshot are shown to this many decimals.
const RAIN_DISPLAY_DECIMALS: i32 = 3;

// ---

/// What a producer delivers.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Raw gateway form upload, imperial units.
    Gateway(GatewayUpload),
    /// Partial update of normalized values from the message bus.
    Bus(FieldUpdate),
}

impl Payload {
    fn normalize(&self, current: &Reading, location: &str, now: i64) -> Reading {
        match self {
            Payload::Gateway(upload) => upload.to_reading(location, now),
            Payload::Bus(update) => update.merge_into(current, location, now),
        }
    }
}

/// Latest reading as served to clients.
#[derive(Debug, Clone, Serialize)]
pub struct LatestSnapshot {
    // ---
    #[serde(flatten)]
    pub reading: Reading,
    /// Local wall-clock time of the reading, `--:--:--` before the first one.
    pub time: String,
    pub windcard: &'static str,
    pub location_name: String,
    pub trend: TrendMap,
}

pub struct Station {
    location: String,
    snapshot: SnapshotStore,
    sink: Arc<dyn ReadingSink>,
    retention: RetentionManager,
    places: PlaceResolver,
}

impl Station {
    pub fn new(
        location: &str,
        sink: Arc<dyn ReadingSink>,
        retention: RetentionManager,
        places: PlaceResolver,
    ) -> Self {
        Self {
            location: location.to_string(),
            snapshot: SnapshotStore::new(location),
            sink,
            retention,
            places,
        }
    }

    /// Configured location id of this station.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Normalize `payload`, publish it as the latest snapshot, then persist
    /// it and opportunistically prune the log.
    ///
    /// Malformed fields never fail ingestion. Storage failures are returned,
    /// but the snapshot update that preceded them stands.
    pub async fn ingest(&self, payload: Payload, location: &str, now: i64) -> Result<Reading> {
        // ---
        let reading = self
            .snapshot
            .update(|current| payload.normalize(current, location, now));

        tracing::info!(
            "Ingested reading ts={} temp={}°C hum={}% wind={}km/h press={}hPa",
            reading.timestamp,
            reading.temperature,
            reading.humidity,
            reading.windspeed,
            reading.pressure
        );

        let appended = self.sink.append(&reading).await;
        if let Err(e) = &appended {
            tracing::error!("Failed to store reading ts={}: {:#}", reading.timestamp, e);
        }

        let rolled = self.sink.upsert_daily_rollup(&reading).await;
        if let Err(e) = &rolled {
            tracing::error!("Failed to update rain rollup ts={}: {:#}", reading.timestamp, e);
        }

        match self.retention.maybe_prune(self.sink.as_ref(), now).await {
            Ok(Some(deleted)) => tracing::debug!("Pruned {} expired rows", deleted),
            Ok(None) => {}
            Err(e) => tracing::warn!("Retention cleanup failed: {:#}", e),
        }

        appended?;
        rolled?;
        Ok(reading)
    }

    /// Latest snapshot with trends, cardinal direction and place name.
    ///
    /// The snapshot is copied under its lock; the place lookup happens after
    /// the lock is released.
    pub async fn latest(&self) -> LatestSnapshot {
        // ---
        let (mut reading, trend) = self.snapshot.read();
        reading.rain = reading.rain.rounded(RAIN_DISPLAY_DECIMALS);
        let location_name = self.places.resolve(&reading.location).await;

        LatestSnapshot {
            time: clock_time(reading.timestamp),
            windcard: CompassRose::Sixteen.label(reading.winddir),
            location_name,
            trend,
            reading,
        }
    }

    /// Minute-bucketed averages over the last `window_hours` (clamped).
    pub async fn history(&self, window_hours: i64, now: i64) -> Result<History> {
        history::query(self.sink.as_ref(), window_hours, now).await
    }

    /// Most recent daily rain rollups, newest first. `days` is clamped to
    /// `1..=366`.
    pub async fn daily_rain(&self, days: u32) -> Result<Vec<DailyRollup>> {
        self.sink
            .daily_rollups(days.clamp(1, MAX_RAIN_DAYS))
            .await
    }
}

fn clock_time(ts: i64) -> String {
    // ---
    if ts == 0 {
        return "--:--:--".to_string();
    }
    Local
        .timestamp_opt(ts, 0)
        .earliest()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}
