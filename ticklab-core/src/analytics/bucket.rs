//! Bucket boundaries and per-bucket counters.

use serde::{Deserialize, Serialize};

/// Boundaries are usable when non-empty, finite, and strictly increasing.
pub fn valid_boundaries(boundaries: &[f64]) -> bool {
    !boundaries.is_empty()
        && boundaries.iter().all(|b| b.is_finite())
        && boundaries.windows(2).all(|w| w[0] < w[1])
}

/// Slot for `value` given `n` boundaries: slot 0 is "below the first
/// boundary", slot `i + 1` is `[b_i, b_{i+1})`, slot `n` is `>= b_last`.
///
/// `boundaries` must satisfy `valid_boundaries`.
pub fn slot_of(boundaries: &[f64], value: f64) -> usize {
    // Number of boundaries <= value.
    boundaries.partition_point(|b| *b <= value)
}

/// Additive counters for one bucket (or for the whole population).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketCounter {
    pub count: u64,
    pub wins: u64,
    /// Sum of profit rates below the outlier ceiling.
    pub trimmed_sum: f64,
    pub trimmed_count: u64,
}

impl BucketCounter {
    pub fn record(&mut self, profit_rate: f64, is_profitable: bool, outlier_ceiling: f64) {
        self.count += 1;
        if is_profitable {
            self.wins += 1;
        }
        if profit_rate < outlier_ceiling {
            self.trimmed_sum += profit_rate;
            self.trimmed_count += 1;
        }
    }

    pub fn merge(&mut self, other: &BucketCounter) {
        self.count += other.count;
        self.wins += other.wins;
        self.trimmed_sum += other.trimmed_sum;
        self.trimmed_count += other.trimmed_count;
    }

    pub fn win_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.wins as f64 / self.count as f64
        }
    }

    pub fn trimmed_avg(&self) -> f64 {
        if self.trimmed_count == 0 {
            0.0
        } else {
            self.trimmed_sum / self.trimmed_count as f64
        }
    }
}

/// Reported statistics for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStat {
    pub label: String,
    /// `None` for the "below first boundary" bucket.
    pub bucket_low: Option<f64>,
    /// `None` for the open-ended last bucket.
    pub bucket_high: Option<f64>,
    pub count: u64,
    pub win_count: u64,
    /// Mean profit rate, excluding records at or above the outlier ceiling.
    pub avg_profit_rate: f64,
}

impl BucketStat {
    pub fn win_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.win_count as f64 / self.count as f64
        }
    }
}

/// Turn slot counters into reported buckets. The "below" bucket is only
/// reported when it saw a value.
pub fn describe(boundaries: &[f64], counters: &[BucketCounter]) -> Vec<BucketStat> {
    let n = boundaries.len();
    let mut stats = Vec::with_capacity(n + 1);
    for (slot, counter) in counters.iter().enumerate().take(n + 1) {
        let (label, low, high) = if slot == 0 {
            if counter.count == 0 {
                continue;
            }
            (format!("<{}", boundaries[0]), None, Some(boundaries[0]))
        } else if slot == n {
            (format!(">={}", boundaries[n - 1]), Some(boundaries[n - 1]), None)
        } else {
            (
                format!("{}-{}", boundaries[slot - 1], boundaries[slot]),
                Some(boundaries[slot - 1]),
                Some(boundaries[slot]),
            )
        };
        stats.push(BucketStat {
            label,
            bucket_low: low,
            bucket_high: high,
            count: counter.count,
            win_count: counter.wins,
            avg_profit_rate: counter.trimmed_avg(),
        });
    }
    stats
}
