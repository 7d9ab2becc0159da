//! Tick: one trade event on an asset's tape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single trade event for one asset.
///
/// The sign of `signed_amount` encodes direction: positive is a buy, negative
/// is a sell. Index 0 of a tape is the asset's creation tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub index: u32,
    pub time_ms: i64,
    pub price: f64,
    pub signed_amount: f64,
    pub market_cap: f64,
    #[serde(default)]
    pub trader_id: String,
}

impl Tick {
    /// Price, or 0.0 when the stored value is not finite.
    pub fn price(&self) -> f64 {
        finite_or_zero(self.price)
    }

    /// Signed amount, or 0.0 when the stored value is not finite.
    pub fn amount(&self) -> f64 {
        finite_or_zero(self.signed_amount)
    }

    pub fn abs_amount(&self) -> f64 {
        self.amount().abs()
    }

    pub fn market_cap(&self) -> f64 {
        finite_or_zero(self.market_cap)
    }

    pub fn is_buy(&self) -> bool {
        self.amount() > 0.0
    }

    pub fn is_sell(&self) -> bool {
        self.amount() < 0.0
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Structural problems with a tape that make it unusable for a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TapeError {
    #[error("tick {index} goes back in time ({time_ms} ms < {previous_ms} ms)")]
    TimeReversal {
        index: usize,
        time_ms: i64,
        previous_ms: i64,
    },
    #[error("tick at position {position} carries index {index}")]
    IndexMismatch { position: usize, index: u32 },
}

/// Check that a tape is ordered by time and indexed by position.
pub fn validate_tape(tape: &[Tick]) -> Result<(), TapeError> {
    for (position, tick) in tape.iter().enumerate() {
        if tick.index as usize != position {
            return Err(TapeError::IndexMismatch {
                position,
                index: tick.index,
            });
        }
        if position > 0 {
            let previous_ms = tape[position - 1].time_ms;
            if tick.time_ms < previous_ms {
                return Err(TapeError::TimeReversal {
                    index: position,
                    time_ms: tick.time_ms,
                    previous_ms,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(index: u32, time_ms: i64) -> Tick {
        Tick {
            index,
            time_ms,
            price: 1.0,
            signed_amount: 1.0,
            market_cap: 100.0,
            trader_id: String::new(),
        }
    }

    #[test]
    fn non_finite_fields_read_as_zero() {
        let t = Tick {
            price: f64::NAN,
            signed_amount: f64::INFINITY,
            market_cap: f64::NEG_INFINITY,
            ..tick(0, 0)
        };
        assert_eq!(t.price(), 0.0);
        assert_eq!(t.amount(), 0.0);
        assert_eq!(t.market_cap(), 0.0);
        assert!(!t.is_buy());
        assert!(!t.is_sell());
    }

    #[test]
    fn direction_follows_sign() {
        let buy = Tick {
            signed_amount: 0.5,
            ..tick(0, 0)
        };
        let sell = Tick {
            signed_amount: -0.5,
            ..tick(0, 0)
        };
        assert!(buy.is_buy());
        assert!(sell.is_sell());
        assert_eq!(sell.abs_amount(), 0.5);
    }

    #[test]
    fn ordered_tape_validates() {
        let tape = vec![tick(0, 0), tick(1, 10), tick(2, 10), tick(3, 25)];
        assert_eq!(validate_tape(&tape), Ok(()));
    }

    #[test]
    fn time_reversal_is_reported() {
        let tape = vec![tick(0, 0), tick(1, 10), tick(2, 5)];
        assert_eq!(
            validate_tape(&tape),
            Err(TapeError::TimeReversal {
                index: 2,
                time_ms: 5,
                previous_ms: 10
            })
        );
    }

    #[test]
    fn index_mismatch_is_reported() {
        let tape = vec![tick(0, 0), tick(5, 10)];
        assert!(matches!(
            validate_tape(&tape),
            Err(TapeError::IndexMismatch { position: 1, .. })
        ));
    }
}
