//! Amount- and price-window features.

use super::preceding;
use crate::domain::Tick;

/// Signed sum of the `count` most recent ticks before `anchor` whose
/// absolute amount is at least `min_amount`.
///
/// Returns `None` when fewer than `count` qualifying ticks exist.
pub fn filtered_trailing_sum(
    tape: &[Tick],
    anchor: usize,
    min_amount: f64,
    count: usize,
) -> Option<f64> {
    let mut found = 0;
    let mut sum = 0.0;
    for tick in preceding(tape, anchor) {
        if found >= count {
            break;
        }
        if tick.abs_amount() >= min_amount {
            sum += tick.amount();
            found += 1;
        }
    }
    (found >= count).then_some(sum)
}

/// Whether the anchor's absolute amount strictly exceeds every one of the
/// `lookback` most recent qualifying (`|amount| >= min_amount`) ticks.
///
/// With no qualifying ticks the anchor is vacuously the maximum.
pub fn is_max_amount(tape: &[Tick], anchor: usize, min_amount: f64, lookback: usize) -> bool {
    let Some(current) = tape.get(anchor) else {
        return false;
    };
    let window_max = preceding(tape, anchor)
        .map(Tick::abs_amount)
        .filter(|a| *a >= min_amount)
        .take(lookback)
        .fold(None, |acc: Option<f64>, a| Some(acc.map_or(a, |m| m.max(a))));

    match window_max {
        None => true,
        Some(m) => current.abs_amount() > m,
    }
}

/// Percentage by which the anchor price sits above the minimum of the
/// `lookback` most recent positive prices: `(current / min - 1) * 100`.
///
/// `None` when the anchor price is not positive or no positive price precedes it.
pub fn price_ratio_to_min(tape: &[Tick], anchor: usize, lookback: usize) -> Option<f64> {
    let current = tape.get(anchor)?.price();
    if current <= 0.0 {
        return None;
    }
    let min = preceding(tape, anchor)
        .map(Tick::price)
        .filter(|p| *p > 0.0)
        .take(lookback)
        .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |m| m.min(p))))?;
    Some((current / min - 1.0) * 100.0)
}

/// Lowest positive price over the `lookback` ticks before `entry`.
///
/// This is the loss-stop floor: it is fixed before the trade opens.
pub fn pre_entry_floor(tape: &[Tick], entry: usize, lookback: usize) -> Option<f64> {
    let end = entry.min(tape.len());
    let start = end.saturating_sub(lookback);
    tape[start..end]
        .iter()
        .map(Tick::price)
        .filter(|p| *p > 0.0)
        .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |m| m.min(p))))
}
