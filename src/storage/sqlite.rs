//! Durable sink backed by SQLite in WAL mode.
//!
//! Every call runs as its own statement on a pooled connection and commits
//! before returning; nothing holds a transaction open across calls.

use std::{path::Path, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use super::ReadingSink;
use crate::models::{DailyRollup, Reading};

const READING_COLUMNS: &str = "ts, location, temperature, humidity, windspeed, winddir, \
    pressure, solarradiation, uv, rainrate_mm, event_mm, hourly_mm, last24h_mm, daily_mm, \
    weekly_mm, monthly_mm, yearly_mm";

const ROLLUP_COLUMNS: &str = "day, ts, rainrate_mm, event_mm, hourly_mm, last24h_mm, \
    daily_mm, weekly_mm, monthly_mm, yearly_mm";

// ---

#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Open (creating if needed) the database at `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        // ---
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL '{url}'"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(10));

        ensure_parent_dir(options.get_filename())?;

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database '{url}'"))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn ensure_parent_dir(file: &Path) -> Result<()> {
    // ---
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
            tracing::info!("Created data directory {}", dir.display());
            Ok(())
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl ReadingSink for SqliteSink {
    // ---
    async fn append(&self, reading: &Reading) -> Result<()> {
        // ---
        sqlx::query(&format!(
            "INSERT INTO readings ({READING_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(reading.timestamp)
        .bind(&reading.location)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.windspeed)
        .bind(reading.winddir)
        .bind(reading.pressure)
        .bind(reading.solarradiation)
        .bind(reading.uv)
        .bind(reading.rain.rainrate_mm)
        .bind(reading.rain.event_mm)
        .bind(reading.rain.hourly_mm)
        .bind(reading.rain.last24h_mm)
        .bind(reading.rain.daily_mm)
        .bind(reading.rain.weekly_mm)
        .bind(reading.rain.monthly_mm)
        .bind(reading.rain.yearly_mm)
        .execute(&self.pool)
        .await
        .context("Failed to append reading")?;

        Ok(())
    }

    async fn upsert_daily_rollup(&self, reading: &Reading) -> Result<()> {
        // ---
        let rollup = DailyRollup::from_reading(reading);

        sqlx::query(&format!(
            r#"
            INSERT INTO rain_rollup_daily ({ROLLUP_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(day) DO UPDATE SET
                ts          = excluded.ts,
                rainrate_mm = excluded.rainrate_mm,
                event_mm    = excluded.event_mm,
                hourly_mm   = excluded.hourly_mm,
                last24h_mm  = excluded.last24h_mm,
                daily_mm    = excluded.daily_mm,
                weekly_mm   = excluded.weekly_mm,
                monthly_mm  = excluded.monthly_mm,
                yearly_mm   = excluded.yearly_mm
            "#
        ))
        .bind(rollup.day)
        .bind(rollup.ts)
        .bind(rollup.rain.rainrate_mm)
        .bind(rollup.rain.event_mm)
        .bind(rollup.rain.hourly_mm)
        .bind(rollup.rain.last24h_mm)
        .bind(rollup.rain.daily_mm)
        .bind(rollup.rain.weekly_mm)
        .bind(rollup.rain.monthly_mm)
        .bind(rollup.rain.yearly_mm)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert rain rollup for day {}", rollup.day))?;

        Ok(())
    }

    async fn prune_before(&self, cutoff: i64) -> Result<u64> {
        // ---
        let result = sqlx::query("DELETE FROM readings WHERE ts < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to prune readings")?;

        Ok(result.rows_affected())
    }

    async fn readings_since(&self, since: i64) -> Result<Vec<Reading>> {
        // ---
        let rows = sqlx::query_as::<_, Reading>(&format!(
            "SELECT {READING_COLUMNS} FROM readings WHERE ts >= ? ORDER BY ts ASC"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load readings")?;

        Ok(rows)
    }

    async fn daily_rollups(&self, limit: u32) -> Result<Vec<DailyRollup>> {
        // ---
        let rows = sqlx::query_as::<_, DailyRollup>(&format!(
            "SELECT {ROLLUP_COLUMNS} FROM rain_rollup_daily ORDER BY day DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load rain rollups")?;

        Ok(rows)
    }
}
