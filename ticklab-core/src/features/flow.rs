//! Order-flow features: buy/sell counts, trade-size mix, streaks.

use serde::{Deserialize, Serialize};

use super::preceding;
use crate::domain::Tick;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    fn matches(self, tick: &Tick) -> bool {
        match self {
            Side::Buy => tick.is_buy(),
            Side::Sell => tick.is_sell(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowCounts {
    pub buys: usize,
    pub sells: usize,
}

/// Buys and sells among the `lookback` ticks before `anchor`.
///
/// Zero-amount ticks use up the window but count as neither.
pub fn buy_sell_counts(tape: &[Tick], anchor: usize, lookback: usize) -> FlowCounts {
    preceding(tape, anchor)
        .take(lookback)
        .fold(FlowCounts::default(), |mut acc, tick| {
            if tick.is_buy() {
                acc.buys += 1;
            } else if tick.is_sell() {
                acc.sells += 1;
            }
            acc
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SizeRatios {
    pub large: f64,
    pub small: f64,
}

/// Share of large (`|a| >= large_threshold`) and small (`|a| < small_threshold`)
/// trades among the `lookback` ticks before `anchor`.
///
/// An empty window gives `(0.0, 0.0)`.
pub fn trade_size_ratios(
    tape: &[Tick],
    anchor: usize,
    lookback: usize,
    large_threshold: f64,
    small_threshold: f64,
) -> SizeRatios {
    let mut total = 0usize;
    let mut large = 0usize;
    let mut small = 0usize;
    for tick in preceding(tape, anchor).take(lookback) {
        let a = tick.abs_amount();
        if a >= large_threshold {
            large += 1;
        }
        if a < small_threshold {
            small += 1;
        }
        total += 1;
    }
    if total == 0 {
        return SizeRatios::default();
    }
    SizeRatios {
        large: large as f64 / total as f64,
        small: small as f64 / total as f64,
    }
}

/// Length of the unbroken run of `side` trades with `|amount| >= threshold`
/// immediately before `anchor`.
pub fn consecutive_streak(tape: &[Tick], anchor: usize, side: Side, threshold: f64) -> usize {
    preceding(tape, anchor)
        .take_while(|tick| side.matches(tick) && tick.abs_amount() >= threshold)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::amounts;

    #[test]
    fn counts_within_lookback() {
        let t = amounts(&[1.0, 1.0, -1.0, 0.0, 2.0, -3.0, 5.0]);
        assert_eq!(buy_sell_counts(&t, 6, 3), FlowCounts { buys: 1, sells: 1 });
        assert_eq!(buy_sell_counts(&t, 6, 100), FlowCounts { buys: 3, sells: 2 });
        assert_eq!(buy_sell_counts(&t, 0, 5), FlowCounts::default());
    }

    #[test]
    fn size_ratios() {
        let t = amounts(&[0.05, 2.0, 0.5, 1.0, 9.0]);
        let r = trade_size_ratios(&t, 4, 4, 1.0, 0.1);
        assert!((r.large - 0.5).abs() < 1e-12);
        assert!((r.small - 0.25).abs() < 1e-12);
    }

    #[test]
    fn size_ratios_empty_window() {
        let t = amounts(&[1.0]);
        assert_eq!(trade_size_ratios(&t, 0, 20, 1.0, 0.1), SizeRatios::default());
    }

    #[test]
    fn streak_breaks_on_direction_or_size() {
        let t = amounts(&[1.0, -1.0, 0.5, 2.0, 3.0, 0.0]);
        assert_eq!(consecutive_streak(&t, 5, Side::Buy, 0.0), 3);
        assert_eq!(consecutive_streak(&t, 5, Side::Buy, 1.0), 2);
        assert_eq!(consecutive_streak(&t, 5, Side::Sell, 0.0), 0);
        assert_eq!(consecutive_streak(&t, 2, Side::Sell, 0.0), 1);
    }
}
