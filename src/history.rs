//! Minute-bucketed history for charting.
//!
//! Rows from the log inside the lookback window are grouped by
//! `floor(ts / 60) * 60` and every metric is averaged per bucket. Buckets
//! without rows are simply absent; nothing is zero-filled.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::models::{Metric, Reading};
use crate::storage::ReadingSink;

pub const MIN_WINDOW_HOURS: i64 = 1;
pub const MAX_WINDOW_HOURS: i64 = 168;
pub const DEFAULT_WINDOW_HOURS: i64 = 24;
pub const BUCKET_SECS: i64 = 60;

/// `(bucket start epoch seconds, average)` pairs, ascending by bucket.
pub type Series = Vec<(i64, f64)>;

/// One series per metric, keyed by the metric's wire name.
pub type History = BTreeMap<&'static str, Series>;

// ---

pub fn clamp_window(hours: i64) -> i64 {
    hours.clamp(MIN_WINDOW_HOURS, MAX_WINDOW_HOURS)
}

pub fn bucket_of(ts: i64) -> i64 {
    ts.div_euclid(BUCKET_SECS) * BUCKET_SECS
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    sums: [f64; Metric::ALL.len()],
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            count: 0,
            sums: [0.0; Metric::ALL.len()],
        }
    }
}

/// Average `rows` per minute bucket. Row order does not matter.
pub fn aggregate(rows: &[Reading]) -> History {
    // ---
    let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
    for row in rows {
        let bucket = buckets.entry(bucket_of(row.timestamp)).or_default();
        bucket.count += 1;
        for (sum, metric) in bucket.sums.iter_mut().zip(Metric::ALL) {
            *sum += row.metric(metric);
        }
    }

    let mut history: History = Metric::ALL
        .into_iter()
        .map(|m| (m.as_str(), Vec::with_capacity(buckets.len())))
        .collect();

    for (start, bucket) in &buckets {
        let n = f64::from(bucket.count);
        for (sum, metric) in bucket.sums.iter().zip(Metric::ALL) {
            if let Some(series) = history.get_mut(metric.as_str()) {
                series.push((*start, sum / n));
            }
        }
    }
    history
}

/// Averages for the last `window_hours` (clamped to 1..=168) before `now`.
pub async fn query(sink: &dyn ReadingSink, window_hours: i64, now: i64) -> Result<History> {
    // ---
    let hours = clamp_window(window_hours);
    let since = now - hours * 3600;
    let rows = sink.readings_since(since).await?;
    tracing::debug!("History: {} rows in the last {}h", rows.len(), hours);
    Ok(aggregate(&rows))
}
