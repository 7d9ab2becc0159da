//! Entry signal evaluation.
//!
//! A candidate tick passes through two stages:
//! 1. Hard filters, always enforced: predecessor exists, distance from
//!    creation, market-cap range, trade-amount range, filtered trailing-sum
//!    range, trade direction. The first failure rejects immediately and no
//!    further features are computed.
//! 2. Mode-gated conditions, in configured order (see `condition`).
//!
//! On acceptance the outcome carries every value the pass computed, so the
//! analytics layer never has to recompute them.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::condition::{default_conditions, Bounds, ConditionMode, ConditionSpec, MeasureCache};
use crate::domain::{FeatureSnapshot, Tick};
use crate::features;

/// Which trade direction a candidate tick must have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Buy,
    #[default]
    Sell,
    Both,
}

impl TradeDirection {
    pub fn admits(&self, signed_amount: f64) -> bool {
        match self {
            TradeDirection::Buy => signed_amount > 0.0,
            TradeDirection::Sell => signed_amount < 0.0,
            TradeDirection::Both => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailingSumFilter {
    /// Ticks below this absolute amount are skipped.
    pub min_amount: f64,
    /// Number of qualifying ticks to sum.
    pub count: usize,
    pub range: Bounds,
}

impl Default for TrailingSumFilter {
    fn default() -> Self {
        Self {
            min_amount: 0.05,
            count: 20,
            range: Bounds(-3.0, 15.0),
        }
    }
}

/// Checks that are enforced regardless of condition modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardFilters {
    pub min_minutes_from_creation: f64,
    pub market_cap: Bounds,
    /// Inclusive range on the absolute trade amount.
    pub trade_amount: Bounds,
    pub trailing_sum: TrailingSumFilter,
    pub direction: TradeDirection,
}

impl Default for HardFilters {
    fn default() -> Self {
        Self {
            min_minutes_from_creation: 0.0,
            market_cap: Bounds(100.0, 250.0),
            trade_amount: Bounds(4.0, 15.0),
            trailing_sum: TrailingSumFilter::default(),
            direction: TradeDirection::Sell,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    pub hard: HardFilters,
    pub conditions: Vec<ConditionSpec>,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            hard: HardFilters::default(),
            conditions: default_conditions(),
        }
    }
}

impl EntryConfig {
    /// True when at least one condition computes values.
    pub fn records_features(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.mode != ConditionMode::Off)
    }
}

/// Why a candidate was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    OutOfRange,
    NoPredecessor,
    TooEarly,
    MarketCap,
    TradeAmount,
    TrailingSumInsufficient,
    TrailingSum,
    Direction,
    /// An online condition computed no value.
    Insufficient(String),
    /// An online condition computed a value outside its threshold.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Rejected(Rejection),
    Accepted(FeatureSnapshot),
}

impl EntryOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EntryOutcome::Accepted(_))
    }
}

/// Decide whether the tick at `candidate` is an admissible entry.
pub fn evaluate(
    tape: &[Tick],
    candidate: usize,
    creation_time_ms: i64,
    config: &EntryConfig,
) -> EntryOutcome {
    match check_hard_filters(tape, candidate, creation_time_ms, &config.hard) {
        Err(rejection) => EntryOutcome::Rejected(rejection),
        Ok(()) => evaluate_conditions(tape, candidate, &config.conditions),
    }
}

// ─── Hard filters ───────────────────────────────────────────────────

fn check_hard_filters(
    tape: &[Tick],
    candidate: usize,
    creation_time_ms: i64,
    hard: &HardFilters,
) -> Result<(), Rejection> {
    let Some(tick) = tape.get(candidate) else {
        return Err(Rejection::OutOfRange);
    };
    if candidate == 0 {
        return Err(Rejection::NoPredecessor);
    }

    let minutes = (tick.time_ms - creation_time_ms) as f64 / 60_000.0;
    if minutes < hard.min_minutes_from_creation {
        return Err(Rejection::TooEarly);
    }
    if !hard.market_cap.contains(tick.market_cap()) {
        return Err(Rejection::MarketCap);
    }
    if !hard.trade_amount.contains(tick.abs_amount()) {
        return Err(Rejection::TradeAmount);
    }

    let filter = &hard.trailing_sum;
    let sum = features::filtered_trailing_sum(tape, candidate, filter.min_amount, filter.count)
        .ok_or(Rejection::TrailingSumInsufficient)?;
    if !filter.range.contains(sum) {
        return Err(Rejection::TrailingSum);
    }

    if !hard.direction.admits(tick.amount()) {
        return Err(Rejection::Direction);
    }
    Ok(())
}

// ─── Mode-gated conditions ──────────────────────────────────────────

fn evaluate_conditions(tape: &[Tick], candidate: usize, specs: &[ConditionSpec]) -> EntryOutcome {
    let mut snapshot = FeatureSnapshot::new();
    let mut cache = MeasureCache::default();

    for spec in specs {
        if spec.mode == ConditionMode::Off {
            continue;
        }
        let value = spec.kind.measure(tape, candidate, &mut cache);

        if spec.mode == ConditionMode::Online {
            match value {
                None => {
                    trace!(candidate, condition = spec.name(), "insufficient data");
                    return EntryOutcome::Rejected(Rejection::Insufficient(spec.name().to_string()));
                }
                Some(v) if !spec.kind.passes(v) => {
                    trace!(candidate, condition = spec.name(), value = v, "condition failed");
                    return EntryOutcome::Rejected(Rejection::Failed(spec.name().to_string()));
                }
                Some(_) => {}
            }
        }
        if let Some(v) = value {
            snapshot.insert(spec.name(), v);
        }
    }

    EntryOutcome::Accepted(snapshot)
}
