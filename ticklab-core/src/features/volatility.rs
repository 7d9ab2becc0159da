//! Coefficient-of-variation volatility over a filtered trade window.

use serde::{Deserialize, Serialize};

use super::preceding;
use crate::domain::Tick;

/// Price, inter-trade time, and amount volatility over one window.
///
/// Each series needs at least two samples; otherwise it is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolatilityWindow {
    pub price: Option<f64>,
    pub time: Option<f64>,
    pub amount: Option<f64>,
    /// Qualifying ticks visited.
    pub samples: usize,
}

/// Population standard deviation divided by `|mean|`.
///
/// `None` for fewer than two values. A constant series and a zero mean both
/// give exactly `0.0`.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let first = values[0];
    if values.iter().all(|v| *v == first) {
        return Some(0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return Some(0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean.abs())
}

/// Walk back from `anchor` over at most `lookback` ticks whose absolute amount
/// is at least `min_amount`, and measure the volatility of their prices,
/// inter-trade gaps, and absolute amounts.
///
/// Only positive prices and positive times contribute. Gaps are taken as
/// `newer - older` while walking backward, so they are never negative on an
/// ordered tape.
pub fn trailing_volatility(
    tape: &[Tick],
    anchor: usize,
    lookback: usize,
    min_amount: f64,
) -> VolatilityWindow {
    let mut prices = Vec::with_capacity(lookback);
    let mut gaps = Vec::with_capacity(lookback);
    let mut amounts = Vec::with_capacity(lookback);
    let mut newer_time: Option<i64> = None;
    let mut samples = 0;

    for tick in preceding(tape, anchor) {
        if samples >= lookback {
            break;
        }
        let amount = tick.abs_amount();
        if amount < min_amount {
            continue;
        }
        if tick.price() > 0.0 {
            prices.push(tick.price());
        }
        if tick.time_ms > 0 {
            if let Some(newer) = newer_time {
                gaps.push((newer - tick.time_ms) as f64);
            }
            newer_time = Some(tick.time_ms);
        }
        amounts.push(amount);
        samples += 1;
    }

    VolatilityWindow {
        price: coefficient_of_variation(&prices),
        time: coefficient_of_variation(&gaps),
        amount: coefficient_of_variation(&amounts),
        samples,
    }
}
