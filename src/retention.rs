//! Self-throttled pruning of the time-series log.
//!
//! Only the `readings` log is pruned. Rain rollups are the long-term record
//! once fine-grained rows are gone and are never touched here.

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;

use crate::storage::ReadingSink;

const SECONDS_PER_DAY: i64 = 86_400;

// ---

#[derive(Debug)]
pub struct RetentionManager {
    horizon_days: i64,
    min_interval_secs: i64,
    /// `None` until the first successful prune of this process.
    last_prune: Mutex<Option<i64>>,
}

impl RetentionManager {
    pub fn new(horizon_days: u32, min_interval_secs: u64) -> Self {
        Self {
            horizon_days: i64::from(horizon_days),
            min_interval_secs: i64::try_from(min_interval_secs).unwrap_or(i64::MAX),
            last_prune: Mutex::new(None),
        }
    }

    fn last(&self) -> MutexGuard<'_, Option<i64>> {
        self.last_prune.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Oldest timestamp that survives a prune at `now`.
    pub fn cutoff(&self, now: i64) -> i64 {
        now.saturating_sub(self.horizon_days.saturating_mul(SECONDS_PER_DAY))
    }

    /// Prune if the minimum interval has passed since the last successful
    /// prune. Returns `None` when gated, else the number of rows deleted.
    pub async fn maybe_prune(&self, sink: &dyn ReadingSink, now: i64) -> Result<Option<u64>> {
        // ---
        let previous = {
            let mut last = self.last();
            if let Some(at) = *last {
                if now.saturating_sub(at) < self.min_interval_secs {
                    return Ok(None);
                }
            }
            // Claim the slot so concurrent ingests do not prune in parallel
            last.replace(now)
        };

        match self.prune_now(sink, now).await {
            Ok(deleted) => Ok(Some(deleted)),
            Err(e) => {
                let mut last = self.last();
                if *last == Some(now) {
                    *last = previous;
                }
                Err(e)
            }
        }
    }

    /// Prune unconditionally, ignoring the interval gate.
    pub async fn prune_now(&self, sink: &dyn ReadingSink, now: i64) -> Result<u64> {
        // ---
        let cutoff = self.cutoff(now);
        let deleted = sink.prune_before(cutoff).await?;
        tracing::info!(
            "Retention cleanup: deleted {} rows older than {} days (ts < {})",
            deleted,
            self.horizon_days,
            cutoff
        );
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::Reading;
    use crate::storage::MemorySink;
    use async_trait::async_trait;

    const NOW: i64 = 1_700_000_000;

    async fn seeded(timestamps: &[i64]) -> MemorySink {
        let sink = MemorySink::new();
        for ts in timestamps {
            let r = Reading {
                timestamp: *ts,
                ..Reading::default()
            };
            sink.append(&r).await.unwrap();
        }
        sink
    }

    #[tokio::test]
    async fn test_first_prune_runs_immediately() {
        // ---
        let manager = RetentionManager::new(30, 6 * 3600);
        let cutoff = manager.cutoff(NOW);
        assert_eq!(cutoff, NOW - 30 * 86_400);

        let sink = seeded(&[cutoff - 10, cutoff - 1, cutoff, NOW]).await;
        assert_eq!(manager.maybe_prune(&sink, NOW).await.unwrap(), Some(2));

        let left: Vec<i64> = sink
            .readings_since(i64::MIN)
            .await
            .unwrap()
            .iter()
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(left, vec![cutoff, NOW]);
    }

    #[tokio::test]
    async fn test_interval_gate() {
        // ---
        let manager = RetentionManager::new(30, 3600);
        let sink = seeded(&[]).await;

        assert_eq!(manager.maybe_prune(&sink, NOW).await.unwrap(), Some(0));
        assert_eq!(manager.maybe_prune(&sink, NOW + 3599).await.unwrap(), None);
        assert_eq!(manager.maybe_prune(&sink, NOW + 3600).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_prune_is_idempotent() {
        // ---
        let manager = RetentionManager::new(1, 0);
        let sink = seeded(&[NOW - 2 * 86_400, NOW - 100]).await;

        assert_eq!(manager.prune_now(&sink, NOW).await.unwrap(), 1);
        assert_eq!(manager.prune_now(&sink, NOW).await.unwrap(), 0);
        assert_eq!(sink.len(), 1);
    }

    struct BrokenSink;

    #[async_trait]
    impl ReadingSink for BrokenSink {
        async fn append(&self, _: &Reading) -> Result<()> {
            Ok(())
        }
        async fn upsert_daily_rollup(&self, _: &Reading) -> Result<()> {
            Ok(())
        }
        async fn prune_before(&self, _: i64) -> Result<u64> {
            anyhow::bail!("disk I/O error")
        }
        async fn readings_since(&self, _: i64) -> Result<Vec<Reading>> {
            Ok(Vec::new())
        }
        async fn daily_rollups(&self, _: u32) -> Result<Vec<crate::models::DailyRollup>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_failed_prune_is_retried() {
        // ---
        let manager = RetentionManager::new(30, 3600);
        assert!(manager.maybe_prune(&BrokenSink, NOW).await.is_err());

        // a failure does not count as the last successful prune
        let sink = seeded(&[]).await;
        assert_eq!(manager.maybe_prune(&sink, NOW + 1).await.unwrap(), Some(0));
    }
}
