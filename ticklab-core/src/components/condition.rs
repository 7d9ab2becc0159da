//! Mode-gated entry conditions.
//!
//! Each condition measures one feature at the candidate tick and compares it
//! against a threshold. The mode decides what happens with the result:
//! - `Off`: nothing is computed.
//! - `Online`: the value is computed and enforced; a missing value rejects.
//! - `Debug`: the value is computed and recorded but never rejects.
//!
//! Conditions are data: a list of `ConditionSpec` loaded from configuration
//! and evaluated in order.

use serde::{Deserialize, Serialize};

use crate::domain::Tick;
use crate::features::{self, Side, VolatilityWindow};

/// How a condition participates in entry evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionMode {
    #[default]
    Off,
    Online,
    Debug,
}

/// Inclusive `[min, max]` range, written as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds(pub f64, pub f64);

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self(min, max)
    }

    pub fn min(&self) -> f64 {
        self.0
    }

    pub fn max(&self) -> f64 {
        self.1
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.0 && value <= self.1
    }

    /// Both ends are numbers and `min <= max`.
    pub fn is_valid(&self) -> bool {
        !self.0.is_nan() && !self.1.is_nan() && self.0 <= self.1
    }
}

/// The feature a condition measures and the threshold it enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionKind {
    /// Milliseconds since the previous tick.
    TimeSinceLastTrade { range: Bounds },
    /// Candidate is the largest trade in the filtered window. Recorded as 1.0 / 0.0.
    MaxAmount { min_amount: f64, lookback: usize },
    PriceVolatility {
        lookback: usize,
        min_amount: f64,
        range: Bounds,
    },
    TimeVolatility {
        lookback: usize,
        min_amount: f64,
        range: Bounds,
    },
    AmountVolatility {
        lookback: usize,
        min_amount: f64,
        range: Bounds,
    },
    /// Percent above the trailing minimum price.
    PriceRatio { lookback: usize, range: Bounds },
    BuyCount { lookback: usize, min: usize },
    SellCount { lookback: usize, min: usize },
    /// Share of `|amount| >= threshold` among the `lookback` ticks before the
    /// candidate. Each ratio condition counts over its own lookback, so
    /// overriding one never widens the other's window.
    LargeTradeRatio {
        lookback: usize,
        threshold: f64,
        range: Bounds,
    },
    /// Share of `|amount| < threshold` over this condition's own `lookback`.
    SmallTradeRatio {
        lookback: usize,
        threshold: f64,
        range: Bounds,
    },
    ConsecutiveBuy { threshold: f64, min: usize },
    ConsecutiveSell { threshold: f64, max: usize },
    RecentTradeCount { window_seconds: i64, range: Bounds },
    /// Mean inter-trade gap in milliseconds.
    AvgTradeInterval { lookback: usize, range: Bounds },
}

impl ConditionKind {
    /// Snapshot key used when the condition carries no explicit name.
    pub fn default_name(&self) -> &'static str {
        match self {
            ConditionKind::TimeSinceLastTrade { .. } => "time_since_last_trade",
            ConditionKind::MaxAmount { .. } => "max_amount",
            ConditionKind::PriceVolatility { .. } => "price_volatility",
            ConditionKind::TimeVolatility { .. } => "time_volatility",
            ConditionKind::AmountVolatility { .. } => "amount_volatility",
            ConditionKind::PriceRatio { .. } => "price_ratio",
            ConditionKind::BuyCount { .. } => "buy_count",
            ConditionKind::SellCount { .. } => "sell_count",
            ConditionKind::LargeTradeRatio { .. } => "large_trade_ratio",
            ConditionKind::SmallTradeRatio { .. } => "small_trade_ratio",
            ConditionKind::ConsecutiveBuy { .. } => "consecutive_buy",
            ConditionKind::ConsecutiveSell { .. } => "consecutive_sell",
            ConditionKind::RecentTradeCount { .. } => "recent_trade_count",
            ConditionKind::AvgTradeInterval { .. } => "avg_trade_interval",
        }
    }

    /// Compute the feature value at `anchor`. `None` means insufficient data.
    pub fn measure(&self, tape: &[Tick], anchor: usize, cache: &mut MeasureCache) -> Option<f64> {
        match self {
            ConditionKind::TimeSinceLastTrade { .. } => {
                features::time_since_previous(tape, anchor).map(|ms| ms as f64)
            }
            ConditionKind::MaxAmount {
                min_amount,
                lookback,
            } => {
                let is_max = features::is_max_amount(tape, anchor, *min_amount, *lookback);
                Some(if is_max { 1.0 } else { 0.0 })
            }
            ConditionKind::PriceVolatility {
                lookback,
                min_amount,
                ..
            } => cache.volatility(tape, anchor, *lookback, *min_amount).price,
            ConditionKind::TimeVolatility {
                lookback,
                min_amount,
                ..
            } => cache.volatility(tape, anchor, *lookback, *min_amount).time,
            ConditionKind::AmountVolatility {
                lookback,
                min_amount,
                ..
            } => cache.volatility(tape, anchor, *lookback, *min_amount).amount,
            ConditionKind::PriceRatio { lookback, .. } => {
                features::price_ratio_to_min(tape, anchor, *lookback)
            }
            ConditionKind::BuyCount { lookback, .. } => {
                Some(features::buy_sell_counts(tape, anchor, *lookback).buys as f64)
            }
            ConditionKind::SellCount { lookback, .. } => {
                Some(features::buy_sell_counts(tape, anchor, *lookback).sells as f64)
            }
            ConditionKind::LargeTradeRatio {
                lookback,
                threshold,
                ..
            } => Some(features::trade_size_ratios(tape, anchor, *lookback, *threshold, 0.0).large),
            ConditionKind::SmallTradeRatio {
                lookback,
                threshold,
                ..
            } => Some(
                features::trade_size_ratios(tape, anchor, *lookback, f64::INFINITY, *threshold)
                    .small,
            ),
            ConditionKind::ConsecutiveBuy { threshold, .. } => {
                Some(features::consecutive_streak(tape, anchor, Side::Buy, *threshold) as f64)
            }
            ConditionKind::ConsecutiveSell { threshold, .. } => {
                Some(features::consecutive_streak(tape, anchor, Side::Sell, *threshold) as f64)
            }
            ConditionKind::RecentTradeCount { window_seconds, .. } => Some(
                features::recent_trade_count(tape, anchor, window_seconds.saturating_mul(1_000))
                    as f64,
            ),
            ConditionKind::AvgTradeInterval { lookback, .. } => {
                features::average_interval(tape, anchor, *lookback)
            }
        }
    }

    /// Whether a computed value satisfies the enforced threshold.
    pub fn passes(&self, value: f64) -> bool {
        match self {
            ConditionKind::MaxAmount { .. } => value >= 1.0,
            ConditionKind::BuyCount { min, .. }
            | ConditionKind::SellCount { min, .. }
            | ConditionKind::ConsecutiveBuy { min, .. } => value >= *min as f64,
            ConditionKind::ConsecutiveSell { max, .. } => value <= *max as f64,
            ConditionKind::TimeSinceLastTrade { range }
            | ConditionKind::PriceVolatility { range, .. }
            | ConditionKind::TimeVolatility { range, .. }
            | ConditionKind::AmountVolatility { range, .. }
            | ConditionKind::PriceRatio { range, .. }
            | ConditionKind::LargeTradeRatio { range, .. }
            | ConditionKind::SmallTradeRatio { range, .. }
            | ConditionKind::RecentTradeCount { range, .. }
            | ConditionKind::AvgTradeInterval { range, .. } => range.contains(value),
        }
    }

    /// Range parameter, for kinds that carry one.
    pub fn range(&self) -> Option<Bounds> {
        match self {
            ConditionKind::TimeSinceLastTrade { range }
            | ConditionKind::PriceVolatility { range, .. }
            | ConditionKind::TimeVolatility { range, .. }
            | ConditionKind::AmountVolatility { range, .. }
            | ConditionKind::PriceRatio { range, .. }
            | ConditionKind::LargeTradeRatio { range, .. }
            | ConditionKind::SmallTradeRatio { range, .. }
            | ConditionKind::RecentTradeCount { range, .. }
            | ConditionKind::AvgTradeInterval { range, .. } => Some(*range),
            _ => None,
        }
    }
}

/// Reuses the volatility window across the three volatility conditions when
/// they share lookback and amount filter.
#[derive(Debug, Default)]
pub struct MeasureCache {
    volatility: Option<(usize, u64, VolatilityWindow)>,
}

impl MeasureCache {
    fn volatility(
        &mut self,
        tape: &[Tick],
        anchor: usize,
        lookback: usize,
        min_amount: f64,
    ) -> VolatilityWindow {
        let key = min_amount.to_bits();
        if let Some((l, k, window)) = self.volatility {
            if l == lookback && k == key {
                return window;
            }
        }
        let window = features::trailing_volatility(tape, anchor, lookback, min_amount);
        self.volatility = Some((lookback, key, window));
        window
    }
}

/// One configured condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Overrides the snapshot key; defaults to the kind's name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub mode: ConditionMode,
    /// Ascending bucket boundaries for analytics.
    #[serde(default)]
    pub buckets: Vec<f64>,
    #[serde(flatten)]
    pub kind: ConditionKind,
}

impl ConditionSpec {
    pub fn new(kind: ConditionKind, mode: ConditionMode) -> Self {
        Self {
            name: None,
            mode,
            buckets: Vec::new(),
            kind,
        }
    }

    pub fn with_buckets(mut self, buckets: &[f64]) -> Self {
        self.buckets = buckets.to_vec();
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.default_name())
    }
}

/// The reference condition list, in evaluation order.
pub fn default_conditions() -> Vec<ConditionSpec> {
    use ConditionKind::*;
    use ConditionMode::{Debug, Off};

    const COUNT_BUCKETS: [f64; 8] = [0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 15.0];
    const STREAK_BUCKETS: [f64; 8] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 7.0, 10.0];

    vec![
        ConditionSpec::new(
            TimeSinceLastTrade {
                range: Bounds(2_000.0, 50_000.0),
            },
            Debug,
        )
        .with_buckets(&[
            0.0, 500.0, 1_000.0, 2_000.0, 3_000.0, 5_000.0, 10_000.0, 20_000.0, 50_000.0,
        ]),
        ConditionSpec::new(
            MaxAmount {
                min_amount: 0.05,
                lookback: 15,
            },
            Off,
        ),
        ConditionSpec::new(
            PriceVolatility {
                lookback: 15,
                min_amount: 0.1,
                range: Bounds(0.0, 1.0),
            },
            Debug,
        )
        .with_buckets(&[0.0, 0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0]),
        ConditionSpec::new(
            TimeVolatility {
                lookback: 15,
                min_amount: 0.1,
                range: Bounds(0.7, 5.0),
            },
            Debug,
        )
        .with_buckets(&[0.0, 0.1, 0.2, 0.5, 0.7, 1.0, 1.5, 2.0, 5.0, 10.0]),
        ConditionSpec::new(
            AmountVolatility {
                lookback: 15,
                min_amount: 0.1,
                range: Bounds(0.2, 1.0),
            },
            Debug,
        )
        .with_buckets(&[0.0, 0.2, 0.5, 0.7, 1.0, 1.5, 2.0, 3.0, 5.0]),
        ConditionSpec::new(
            PriceRatio {
                lookback: 10,
                range: Bounds(0.0, 3.0),
            },
            Debug,
        )
        .with_buckets(&[0.0, 1.0, 2.0, 3.0, 5.0, 10.0, 20.0, 50.0]),
        ConditionSpec::new(BuyCount { lookback: 15, min: 6 }, Debug).with_buckets(&COUNT_BUCKETS),
        ConditionSpec::new(SellCount { lookback: 15, min: 3 }, Debug)
            .with_buckets(&COUNT_BUCKETS),
        ConditionSpec::new(
            LargeTradeRatio {
                lookback: 20,
                threshold: 1.0,
                range: Bounds(0.0, 0.1),
            },
            Debug,
        )
        .with_buckets(&[0.0, 0.05, 0.1, 0.2, 0.3, 0.5, 0.7, 1.0]),
        ConditionSpec::new(
            SmallTradeRatio {
                lookback: 20,
                threshold: 0.1,
                range: Bounds(0.0, 0.3),
            },
            Debug,
        )
        .with_buckets(&[0.0, 0.1, 0.2, 0.3, 0.5, 0.7, 1.0]),
        ConditionSpec::new(
            ConsecutiveBuy {
                threshold: 0.0,
                min: 3,
            },
            Debug,
        )
        .with_buckets(&STREAK_BUCKETS),
        ConditionSpec::new(
            ConsecutiveSell {
                threshold: 0.0,
                max: 2,
            },
            Debug,
        )
        .with_buckets(&STREAK_BUCKETS),
        ConditionSpec::new(
            RecentTradeCount {
                window_seconds: 30,
                range: Bounds(5.0, 50.0),
            },
            Debug,
        )
        .with_buckets(&[0.0, 3.0, 5.0, 10.0, 15.0, 20.0, 30.0, 50.0, 100.0]),
        ConditionSpec::new(
            AvgTradeInterval {
                lookback: 30,
                range: Bounds(0.0, 2_000.0),
            },
            Debug,
        )
        .with_buckets(&[
            0.0, 200.0, 500.0, 1_000.0, 2_000.0, 3_000.0, 5_000.0, 10_000.0, 30_000.0,
        ]),
    ]
}
