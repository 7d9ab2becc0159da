//! Exit state machine.
//!
//! Given an opened position, scans forward from the fill tick and applies the
//! exit rules in a fixed priority order. The first rule that fires closes the
//! position. If none fires, the position is closed on the last tick.
//!
//! Priority:
//! 1. Market-cap take-profit
//! 2. Profit-rate take-profit
//! 3. Sell pressure
//! 4. Loss stop below the pre-entry floor
//! 5. Retracement stop, confirmed by inflections
//! 6. Time stop
//! 7. Spike
//! 8. Quiet period
//! 9. Rebound sell
//!
//! State carried across ticks: peak price and peak profit rate, the
//! retracement window and inflection counter, and the deep-loss latch.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, Tick};
use crate::features;

// ─── Configuration ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfitTakeRule {
    pub enabled: bool,
    /// Profit rate as a fraction (0.5 = +50%).
    pub threshold: f64,
}

impl Default for ProfitTakeRule {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellPressureRule {
    pub enabled: bool,
    /// Ticks since entry to inspect. Zero inspects nothing, so `all_sell` fires at once.
    pub lookback: usize,
    /// Fires when the signed sum of the window is below this.
    pub sum_threshold: f64,
    /// Also fire when every trade in the window is a sell.
    pub all_sell: bool,
}

impl Default for SellPressureRule {
    fn default() -> Self {
        Self {
            enabled: false,
            lookback: 10,
            sum_threshold: -20.0,
            all_sell: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossStopRule {
    /// Loss as a fraction (0.3 = -30%).
    pub loss_fraction: f64,
    /// Ticks before entry used to establish the price floor.
    pub floor_lookback: usize,
}

impl Default for LossStopRule {
    fn default() -> Self {
        Self {
            loss_fraction: 0.3,
            floor_lookback: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetracementRule {
    /// Threshold while the peak profit is below `high_profit_threshold`.
    pub low: f64,
    /// Threshold once the peak profit has reached `high_profit_threshold`.
    pub high: f64,
    pub high_profit_threshold: f64,
    /// Inflections needed before the stop fires.
    pub min_inflections: usize,
    pub inflection_window: usize,
    pub min_hold_ms: i64,
    pub min_profit: f64,
}

impl Default for RetracementRule {
    fn default() -> Self {
        Self {
            low: 0.05,
            high: 0.1,
            high_profit_threshold: 0.4,
            min_inflections: 1,
            inflection_window: 5,
            min_hold_ms: 60_000,
            min_profit: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeRule {
    pub enabled: bool,
    pub lookback_ms: i64,
    /// Rise in percent versus the reference price.
    pub threshold_pct: f64,
}

impl Default for SpikeRule {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_ms: 1_000,
            threshold_pct: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietPeriodRule {
    pub enabled: bool,
    pub seconds: f64,
    pub min_amount: f64,
}

impl Default for QuietPeriodRule {
    fn default() -> Self {
        Self {
            enabled: true,
            seconds: 20.0,
            min_amount: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReboundRule {
    pub enabled: bool,
    /// Depth of the earlier loss, in percent.
    pub min_loss_pct: f64,
    /// Recovered profit, in percent.
    pub min_profit_pct: f64,
    pub min_buy_amount: f64,
}

impl Default for ReboundRule {
    fn default() -> Self {
        Self {
            enabled: true,
            min_loss_pct: 7.0,
            min_profit_pct: 5.0,
            min_buy_amount: 2.5,
        }
    }
}

/// Complete exit parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    pub take_profit_market_cap: f64,
    pub profit_take: ProfitTakeRule,
    pub sell_pressure: SellPressureRule,
    pub loss_stop: LossStopRule,
    pub retracement: RetracementRule,
    pub max_hold_seconds: f64,
    pub spike: SpikeRule,
    pub quiet_period: QuietPeriodRule,
    pub rebound: ReboundRule,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            take_profit_market_cap: 300.0,
            profit_take: ProfitTakeRule::default(),
            sell_pressure: SellPressureRule::default(),
            loss_stop: LossStopRule::default(),
            retracement: RetracementRule::default(),
            max_hold_seconds: 6_000.0,
            spike: SpikeRule::default(),
            quiet_period: QuietPeriodRule::default(),
            rebound: ReboundRule::default(),
        }
    }
}

/// Where and why a position closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitSignal {
    pub exit_index: usize,
    pub reason: ExitReason,
}

// ─── State machine ──────────────────────────────────────────────────

/// Per-position exit state.
#[derive(Debug, Clone)]
pub struct ExitTracker<'a> {
    config: &'a ExitConfig,
    entry_index: usize,
    entry_price: f64,
    entry_time: i64,
    floor: Option<f64>,
    peak_price: f64,
    peak_profit_rate: f64,
    in_retracement: bool,
    inflections: usize,
    window: VecDeque<f64>,
    min_profit_rate: f64,
    deep_loss_seen: bool,
}

impl<'a> ExitTracker<'a> {
    pub fn new(
        tape: &[Tick],
        entry_index: usize,
        entry_price: f64,
        entry_time: i64,
        config: &'a ExitConfig,
    ) -> Self {
        Self {
            config,
            entry_index,
            entry_price,
            entry_time,
            floor: features::pre_entry_floor(tape, entry_index, config.loss_stop.floor_lookback),
            peak_price: entry_price,
            peak_profit_rate: 0.0,
            in_retracement: false,
            inflections: 0,
            window: VecDeque::with_capacity(config.retracement.inflection_window),
            min_profit_rate: 0.0,
            deep_loss_seen: false,
        }
    }

    pub fn peak_price(&self) -> f64 {
        self.peak_price
    }

    pub fn inflections(&self) -> usize {
        self.inflections
    }

    fn profit_rate(&self, price: f64) -> f64 {
        if self.entry_price > 0.0 {
            (price - self.entry_price) / self.entry_price
        } else {
            0.0
        }
    }

    /// Process tick `i` (which must be at or after the entry index).
    ///
    /// Returns the exit when a rule fires.
    pub fn on_tick(&mut self, tape: &[Tick], i: usize) -> Option<ExitSignal> {
        let cfg = self.config;
        let tick = &tape[i];
        let price = tick.price();
        let amount = tick.amount();
        let fire = |reason| {
            Some(ExitSignal {
                exit_index: i,
                reason,
            })
        };

        if price > self.peak_price {
            self.peak_price = price;
            self.peak_profit_rate = self.profit_rate(price);
        }
        let profit_rate = self.profit_rate(price);

        if profit_rate < self.min_profit_rate {
            self.min_profit_rate = profit_rate;
            if self.min_profit_rate <= -cfg.rebound.min_loss_pct / 100.0 {
                self.deep_loss_seen = true;
            }
        }

        if tick.market_cap() >= cfg.take_profit_market_cap {
            return fire(ExitReason::MarketCapTakeProfit);
        }

        if cfg.profit_take.enabled && profit_rate >= cfg.profit_take.threshold {
            return fire(ExitReason::ProfitRateTakeProfit);
        }

        if cfg.sell_pressure.enabled && self.sell_pressure(tape, i) {
            return fire(ExitReason::SellPressure);
        }

        if profit_rate <= -cfg.loss_stop.loss_fraction {
            if let Some(floor) = self.floor {
                if price < floor {
                    return fire(ExitReason::LossStop);
                }
            }
        }

        if self.retracement(price, tick.time_ms, profit_rate) {
            return fire(ExitReason::RetracementStop);
        }

        let hold_seconds = (tick.time_ms - self.entry_time) as f64 / 1_000.0;
        if hold_seconds > cfg.max_hold_seconds {
            let exit_index = if i > self.entry_index { i - 1 } else { i };
            return Some(ExitSignal {
                exit_index,
                reason: ExitReason::TimeStop,
            });
        }

        if cfg.spike.enabled && profit_rate > 0.0 && self.spike(tape, i) {
            return fire(ExitReason::SpikeStop);
        }

        if cfg.quiet_period.enabled && amount < 0.0 && self.quiet(tape, i) {
            return fire(ExitReason::QuietPeriodStop);
        }

        if cfg.rebound.enabled
            && self.deep_loss_seen
            && profit_rate >= cfg.rebound.min_profit_pct / 100.0
            && amount >= cfg.rebound.min_buy_amount
        {
            return fire(ExitReason::ReboundSell);
        }

        None
    }

    // ── Rules with lookbacks ──

    fn sell_pressure(&self, tape: &[Tick], i: usize) -> bool {
        let rule = &self.config.sell_pressure;
        let start = i.saturating_sub(rule.lookback).max(self.entry_index).min(i);
        if i - start < rule.lookback {
            return false;
        }
        // A zero lookback gives an empty window, which counts as all sells.
        let window = &tape[start..i];
        if rule.all_sell && window.iter().all(Tick::is_sell) {
            return true;
        }
        window.iter().map(Tick::amount).sum::<f64>() < rule.sum_threshold
    }

    /// Advance the retracement state. Returns true when the stop fires.
    fn retracement(&mut self, price: f64, time_ms: i64, profit_rate: f64) -> bool {
        let rule = &self.config.retracement;
        let armed = self.peak_price > self.entry_price
            && time_ms - self.entry_time >= rule.min_hold_ms
            && profit_rate >= rule.min_profit;
        if !armed {
            return false;
        }

        let retracement = (self.peak_price - price) / self.peak_price;
        let threshold = if self.peak_profit_rate < rule.high_profit_threshold {
            rule.low
        } else {
            rule.high
        };

        if retracement < threshold {
            self.in_retracement = false;
            self.inflections = 0;
            self.window.clear();
            return false;
        }

        if !self.in_retracement {
            self.in_retracement = true;
            self.inflections = 0;
            self.window.clear();
        }
        self.window.push_back(price);

        let size = rule.inflection_window.max(1);
        if self.window.len() >= size {
            // Index arithmetic kept as is: for even sizes `mid` sits right of centre.
            let mid = size / 2;
            let mid_price = self.window[mid];
            let max_price = self
                .window
                .iter()
                .take(size)
                .fold(f64::NEG_INFINITY, |m, p| m.max(*p));
            let first = self.window[0];
            let last = self.window[self.window.len() - 1];
            if mid_price == max_price && mid_price > first && mid_price > last {
                self.inflections += 1;
            }
            self.window.pop_front();
        }

        self.inflections >= rule.min_inflections
    }

    fn spike(&self, tape: &[Tick], i: usize) -> bool {
        let rule = &self.config.spike;
        let current = &tape[i];
        let start = current.time_ms - rule.lookback_ms;
        let reference = tape[self.entry_index..i]
            .iter()
            .rev()
            .find(|t| t.time_ms <= start)
            .map(Tick::price);
        match reference {
            Some(r) if r > 0.0 => (current.price() - r) / r * 100.0 >= rule.threshold_pct,
            _ => false,
        }
    }

    fn quiet(&self, tape: &[Tick], i: usize) -> bool {
        let rule = &self.config.quiet_period;
        let current = &tape[i];
        let held_seconds = (current.time_ms - self.entry_time) as f64 / 1_000.0;
        if held_seconds < rule.seconds {
            return false;
        }
        let window_start = current.time_ms - (rule.seconds * 1_000.0) as i64;
        let lower = (self.entry_index + 1).min(i);
        let has_large_trade = tape[lower..i]
            .iter()
            .rev()
            .take_while(|t| t.time_ms >= window_start)
            .any(|t| t.abs_amount() >= rule.min_amount);
        !has_large_trade
    }
}

/// Resolve the exit for a position opened at `entry_index`.
///
/// `entry_time` is the fill time, which may be later than the fill tick's own
/// timestamp when an execution delay applies.
pub fn resolve(
    tape: &[Tick],
    entry_index: usize,
    entry_price: f64,
    entry_time: i64,
    config: &ExitConfig,
) -> ExitSignal {
    let last = tape.len().saturating_sub(1);
    let mut tracker = ExitTracker::new(tape, entry_index, entry_price, entry_time, config);
    for i in entry_index..tape.len() {
        if let Some(signal) = tracker.on_tick(tape, i) {
            return signal;
        }
    }
    ExitSignal {
        exit_index: last,
        reason: ExitReason::TapeEnd,
    }
}
