//! Delayed fill resolution.

use crate::domain::Tick;

/// Fill price and index for an order placed at `from` and executed at
/// `target_time_ms`.
///
/// The price holds from the last tick before the first tick at or after the
/// target time. With no such tick, the fill stays at `from`.
pub fn price_at_time(tape: &[Tick], target_time_ms: i64, from: usize) -> (f64, usize) {
    let reached = tape
        .iter()
        .skip(from + 1)
        .position(|t| t.time_ms >= target_time_ms);
    if let Some(offset) = reached {
        let k = from + offset;
        return (tape[k].price(), k);
    }
    let from = from.min(tape.len().saturating_sub(1));
    (tape.get(from).map_or(0.0, Tick::price), from)
}
