//! Feature engine: backward-looking statistics anchored at a tick.
//!
//! Every function here is pure and reads the tape strictly before the anchor
//! (a few also read the anchor tick itself, as documented). Short tapes and
//! sparse windows produce `None` ("insufficient data") rather than an error.
//! Malformed numeric fields read as zero through the `Tick` accessors, so a
//! bad record degrades a feature instead of aborting the run.

pub mod flow;
pub mod timing;
pub mod volatility;
pub mod window;

pub use flow::{
    buy_sell_counts, consecutive_streak, trade_size_ratios, FlowCounts, Side, SizeRatios,
};
pub use timing::{average_interval, recent_trade_count, time_since_previous};
pub use volatility::{coefficient_of_variation, trailing_volatility, VolatilityWindow};
pub use window::{filtered_trailing_sum, is_max_amount, pre_entry_floor, price_ratio_to_min};

use crate::domain::Tick;

/// Ticks strictly before `anchor`, newest first.
pub(crate) fn preceding(tape: &[Tick], anchor: usize) -> impl Iterator<Item = &Tick> {
    tape[..anchor.min(tape.len())].iter().rev()
}
