//! Position: one closed round trip produced by the driver.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::FeatureSnapshot;

/// Which exit rule closed a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    MarketCapTakeProfit,
    ProfitRateTakeProfit,
    SellPressure,
    LossStop,
    RetracementStop,
    TimeStop,
    SpikeStop,
    QuietPeriodStop,
    ReboundSell,
    TapeEnd,
}

impl ExitReason {
    pub const ALL: [ExitReason; 10] = [
        ExitReason::MarketCapTakeProfit,
        ExitReason::ProfitRateTakeProfit,
        ExitReason::SellPressure,
        ExitReason::LossStop,
        ExitReason::RetracementStop,
        ExitReason::TimeStop,
        ExitReason::SpikeStop,
        ExitReason::QuietPeriodStop,
        ExitReason::ReboundSell,
        ExitReason::TapeEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::MarketCapTakeProfit => "market_cap_take_profit",
            ExitReason::ProfitRateTakeProfit => "profit_rate_take_profit",
            ExitReason::SellPressure => "sell_pressure",
            ExitReason::LossStop => "loss_stop",
            ExitReason::RetracementStop => "retracement_stop",
            ExitReason::TimeStop => "time_stop",
            ExitReason::SpikeStop => "spike_stop",
            ExitReason::QuietPeriodStop => "quiet_period_stop",
            ExitReason::ReboundSell => "rebound_sell",
            ExitReason::TapeEnd => "tape_end",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed trade.
///
/// `entry_index` and `exit_index` are the delayed fill ticks; `signal_index`
/// and `exit_signal_index` are the ticks where the entry and exit rules fired.
/// Times are the delayed fill times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub signal_index: usize,
    pub entry_index: usize,
    pub entry_price: f64,
    pub entry_time: i64,
    pub exit_signal_index: usize,
    pub exit_index: usize,
    pub exit_price: f64,
    pub exit_time: i64,
    pub exit_reason: ExitReason,
    pub size_sol: f64,
    pub realized_profit_sol: f64,
    pub profit_rate: f64,
    pub is_profitable: bool,
    /// Feature values recorded when the entry was accepted.
    #[serde(default)]
    pub features: FeatureSnapshot,
}

impl Position {
    /// Milliseconds between the entry fill and the exit fill.
    pub fn holding_ms(&self) -> i64 {
        self.exit_time - self.entry_time
    }

    /// Number of ticks spanned, counting both ends.
    pub fn ticks_held(&self) -> usize {
        self.exit_index - self.entry_index + 1
    }

    pub fn price_change_pct(&self) -> f64 {
        if self.entry_price > 0.0 {
            (self.exit_price - self.entry_price) / self.entry_price * 100.0
        } else {
            0.0
        }
    }
}
