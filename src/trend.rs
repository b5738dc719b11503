//! Up/down/same classification against the previously ingested value.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::{Metric, Reading};

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Same,
}

/// Trend per metric, keyed by the metric's wire name.
pub type TrendMap = BTreeMap<&'static str, Trend>;

/// Holds the value each metric had at the previous ingestion.
#[derive(Debug, Default)]
pub struct TrendTracker {
    previous: HashMap<Metric, f64>,
}

impl TrendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `value` with the stored previous value, then replace it.
    ///
    /// The first observation of a metric is always `Same`.
    pub fn classify(&mut self, metric: Metric, value: f64) -> Trend {
        // ---
        let trend = match self.previous.get(&metric) {
            Some(old) if value > *old => Trend::Up,
            Some(old) if value < *old => Trend::Down,
            _ => Trend::Same,
        };
        self.previous.insert(metric, value);
        trend
    }

    /// Classify every trended metric of `reading`, in fixed order, advancing
    /// the previous-value map exactly once.
    pub fn advance(&mut self, reading: &Reading) -> TrendMap {
        Metric::TRENDED
            .into_iter()
            .map(|metric| (metric.as_str(), self.classify(metric, reading.metric(metric))))
            .collect()
    }
}

/// All-`Same` map, reported before anything has been ingested.
pub fn flat_trends() -> TrendMap {
    Metric::TRENDED
        .into_iter()
        .map(|metric| (metric.as_str(), Trend::Same))
        .collect()
}
