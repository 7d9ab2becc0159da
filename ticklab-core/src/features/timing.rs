//! Time-based features.

use super::preceding;
use crate::domain::Tick;

/// Milliseconds since the previous tick. `None` at index 0.
pub fn time_since_previous(tape: &[Tick], anchor: usize) -> Option<i64> {
    if anchor == 0 || anchor >= tape.len() {
        return None;
    }
    Some(tape[anchor].time_ms - tape[anchor - 1].time_ms)
}

/// Ticks before `anchor` that fall within `window_ms` of the anchor's time.
pub fn recent_trade_count(tape: &[Tick], anchor: usize, window_ms: i64) -> usize {
    let Some(current) = tape.get(anchor) else {
        return 0;
    };
    let window_start = current.time_ms - window_ms;
    preceding(tape, anchor)
        .take_while(|tick| tick.time_ms >= window_start)
        .count()
}

/// Mean gap between consecutive positive timestamps over the anchor and the
/// `lookback` ticks before it. Needs at least two timestamps.
pub fn average_interval(tape: &[Tick], anchor: usize, lookback: usize) -> Option<f64> {
    if anchor >= tape.len() {
        return None;
    }
    let start = anchor.saturating_sub(lookback);
    let times: Vec<i64> = tape[start..=anchor]
        .iter()
        .rev()
        .map(|t| t.time_ms)
        .filter(|t| *t > 0)
        .collect();
    if times.len() < 2 {
        return None;
    }
    let total: i64 = times.windows(2).map(|w| w[0] - w[1]).sum();
    Some(total as f64 / (times.len() - 1) as f64)
}
