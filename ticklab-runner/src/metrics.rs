//! Summary metrics over closed positions.
//!
//! Counts (total trades, winners, exit reasons) cover every position.
//! Totals and averages leave out positions whose profit rate reaches the
//! outlier ceiling, so one runaway trade cannot dominate a sweep ranking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ticklab_core::domain::{ExitReason, Position};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub win_rate: f64,
    /// Positions that enter totals and averages.
    pub included_trades: usize,
    pub excluded_outliers: usize,
    pub total_profit_sol: f64,
    pub avg_profit_sol: f64,
    pub avg_profit_rate: f64,
    pub exit_reasons: BTreeMap<ExitReason, usize>,
    pub assets_with_trades: usize,
}

impl SummaryStats {
    /// Compute from per-asset position lists.
    pub fn compute<'a, I>(assets: I, outlier_ceiling: f64) -> Self
    where
        I: IntoIterator<Item = &'a [Position]>,
    {
        let mut stats = Self::default();
        let mut rate_sum = 0.0;

        for positions in assets {
            if !positions.is_empty() {
                stats.assets_with_trades += 1;
            }
            for p in positions {
                stats.total_trades += 1;
                if p.is_profitable {
                    stats.profitable_trades += 1;
                }
                *stats.exit_reasons.entry(p.exit_reason).or_insert(0) += 1;

                if p.profit_rate >= outlier_ceiling {
                    stats.excluded_outliers += 1;
                    continue;
                }
                stats.included_trades += 1;
                stats.total_profit_sol += p.realized_profit_sol;
                rate_sum += p.profit_rate;
            }
        }

        stats.win_rate = ratio(stats.profitable_trades as f64, stats.total_trades);
        stats.avg_profit_sol = ratio(stats.total_profit_sol, stats.included_trades);
        stats.avg_profit_rate = ratio(rate_sum, stats.included_trades);
        stats
    }

    pub fn from_positions(positions: &[Position], outlier_ceiling: f64) -> Self {
        Self::compute(std::iter::once(positions), outlier_ceiling)
    }

    /// Exit reasons by descending count, ties in declaration order.
    pub fn exit_reasons_by_count(&self) -> Vec<(ExitReason, usize)> {
        let mut reasons: Vec<_> = self.exit_reasons.iter().map(|(r, n)| (*r, *n)).collect();
        reasons.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        reasons
    }
}

fn ratio(numerator: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        numerator / count as f64
    }
}
