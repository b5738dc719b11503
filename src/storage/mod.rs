//! Persistence sinks for normalized readings.
//!
//! The pipeline writes through [`ReadingSink`] only, so the durable SQLite
//! log and the in-process sink are interchangeable.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DailyRollup, Reading};

mod memory;
mod sqlite;

pub use memory::MemorySink;
pub use sqlite::SqliteSink;

// ---

#[async_trait]
pub trait ReadingSink: Send + Sync {
    // ---
    /// Append one reading to the time-series log.
    async fn append(&self, reading: &Reading) -> Result<()>;

    /// Insert or overwrite the rain rollup row for the reading's local day.
    async fn upsert_daily_rollup(&self, reading: &Reading) -> Result<()>;

    /// Delete log rows with `ts < cutoff`. Returns the number removed.
    async fn prune_before(&self, cutoff: i64) -> Result<u64>;

    /// Log rows with `ts >= since`, oldest first.
    async fn readings_since(&self, since: i64) -> Result<Vec<Reading>>;

    /// Most recent rollup rows, newest day first.
    async fn daily_rollups(&self, limit: u32) -> Result<Vec<DailyRollup>>;
}
