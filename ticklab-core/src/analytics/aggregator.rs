//! Debug analytics aggregator.
//!
//! Correlates each recorded feature with trade outcome. Every closed position
//! contributes one `DebugRecord`; for each condition with usable bucket
//! boundaries its value lands in exactly one bucket.
//!
//! State is purely additive, so per-worker aggregators merge into the same
//! result a single sequential aggregator would produce.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::bucket::{describe, slot_of, valid_boundaries, BucketCounter, BucketStat};
use crate::components::{ConditionMode, EntryConfig};
use crate::domain::{FeatureSnapshot, Position};

/// Profit rates at or above this are left out of averages by default.
pub const DEFAULT_OUTLIER_CEILING: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Condition name → ascending bucket boundaries.
    pub buckets: BTreeMap<String, Vec<f64>>,
    pub outlier_ceiling: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
            outlier_ceiling: DEFAULT_OUTLIER_CEILING,
        }
    }
}

impl AnalyticsConfig {
    /// Bucket every non-Off condition that declares boundaries.
    pub fn from_entry(entry: &EntryConfig, outlier_ceiling: f64) -> Self {
        let buckets = entry
            .conditions
            .iter()
            .filter(|c| c.mode != ConditionMode::Off && !c.buckets.is_empty())
            .map(|c| (c.name().to_string(), c.buckets.clone()))
            .collect();
        Self {
            buckets,
            outlier_ceiling,
        }
    }
}

/// One closed position's outcome and its recorded features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugRecord {
    pub profit_rate: f64,
    pub is_profitable: bool,
    pub features: FeatureSnapshot,
}

impl DebugRecord {
    pub fn from_position(position: &Position) -> Self {
        Self {
            profit_rate: position.profit_rate,
            is_profitable: position.is_profitable,
            features: position.features.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ConditionBuckets {
    boundaries: Vec<f64>,
    counters: Vec<BucketCounter>,
}

impl ConditionBuckets {
    fn new(boundaries: Vec<f64>) -> Self {
        let counters = vec![BucketCounter::default(); boundaries.len() + 1];
        Self {
            boundaries,
            counters,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregator {
    outlier_ceiling: f64,
    conditions: BTreeMap<String, ConditionBuckets>,
    overall: BucketCounter,
}

/// Aggregated analytics for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_records: u64,
    pub win_count: u64,
    pub win_rate: f64,
    /// Records below the outlier ceiling.
    pub trimmed_records: u64,
    pub avg_profit_rate: f64,
    pub outlier_ceiling: f64,
    pub conditions: BTreeMap<String, Vec<BucketStat>>,
}

impl Aggregator {
    /// Conditions whose boundaries are empty or not strictly increasing are
    /// dropped with a warning; the rest of the run is unaffected.
    pub fn new(config: &AnalyticsConfig) -> Self {
        let mut conditions = BTreeMap::new();
        for (name, boundaries) in &config.buckets {
            if valid_boundaries(boundaries) {
                conditions.insert(name.clone(), ConditionBuckets::new(boundaries.clone()));
            } else {
                warn!(condition = %name, ?boundaries, "unusable bucket boundaries, skipping condition");
            }
        }
        Self {
            outlier_ceiling: config.outlier_ceiling,
            conditions,
            overall: BucketCounter::default(),
        }
    }

    pub fn ingest(&mut self, record: &DebugRecord) {
        let ceiling = self.outlier_ceiling;
        self.overall
            .record(record.profit_rate, record.is_profitable, ceiling);
        for (name, value) in record.features.iter() {
            if let Some(buckets) = self.conditions.get_mut(name) {
                let slot = slot_of(&buckets.boundaries, value);
                buckets.counters[slot].record(record.profit_rate, record.is_profitable, ceiling);
            }
        }
    }

    pub fn ingest_position(&mut self, position: &Position) {
        self.ingest(&DebugRecord::from_position(position));
    }

    /// Add another aggregator's counts into this one.
    ///
    /// Conditions are matched by name; a condition whose boundaries differ is
    /// skipped with a warning.
    pub fn merge(&mut self, other: &Aggregator) {
        self.overall.merge(&other.overall);
        for (name, theirs) in &other.conditions {
            match self.conditions.get_mut(name) {
                Some(ours) if ours.boundaries == theirs.boundaries => {
                    for (a, b) in ours.counters.iter_mut().zip(&theirs.counters) {
                        a.merge(b);
                    }
                }
                Some(_) => {
                    warn!(condition = %name, "bucket boundaries differ, not merging");
                }
                None => {
                    self.conditions.insert(name.clone(), theirs.clone());
                }
            }
        }
    }

    pub fn record_count(&self) -> u64 {
        self.overall.count
    }

    pub fn summarize(&self) -> AnalyticsSummary {
        let conditions = self
            .conditions
            .iter()
            .map(|(name, b)| (name.clone(), describe(&b.boundaries, &b.counters)))
            .collect();
        AnalyticsSummary {
            total_records: self.overall.count,
            win_count: self.overall.wins,
            win_rate: self.overall.win_rate(),
            trimmed_records: self.overall.trimmed_count,
            avg_profit_rate: self.overall.trimmed_avg(),
            outlier_ceiling: self.outlier_ceiling,
            conditions,
        }
    }
}
