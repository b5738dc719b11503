//! Process-local sink, used when durable storage is switched off.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;

use super::ReadingSink;
use crate::models::{DailyRollup, Reading};

// ---

#[derive(Debug, Default)]
pub struct MemorySink {
    readings: Mutex<Vec<Reading>>,
    rollups: Mutex<BTreeMap<i64, DailyRollup>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.readings).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReadingSink for MemorySink {
    // ---
    async fn append(&self, reading: &Reading) -> Result<()> {
        lock(&self.readings).push(reading.clone());
        Ok(())
    }

    async fn upsert_daily_rollup(&self, reading: &Reading) -> Result<()> {
        let rollup = DailyRollup::from_reading(reading);
        lock(&self.rollups).insert(rollup.day, rollup);
        Ok(())
    }

    async fn prune_before(&self, cutoff: i64) -> Result<u64> {
        let mut readings = lock(&self.readings);
        let before = readings.len();
        readings.retain(|r| r.timestamp >= cutoff);
        Ok((before - readings.len()) as u64)
    }

    async fn readings_since(&self, since: i64) -> Result<Vec<Reading>> {
        let mut rows: Vec<Reading> = lock(&self.readings)
            .iter()
            .filter(|r| r.timestamp >= since)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.timestamp);
        Ok(rows)
    }

    async fn daily_rollups(&self, limit: u32) -> Result<Vec<DailyRollup>> {
        Ok(lock(&self.rollups)
            .values()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
