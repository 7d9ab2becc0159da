//! Tick-by-tick backtest loop for one asset.
//!
//! The cursor starts at index 1 (index 0 is the creation tick). At each
//! candidate:
//! 1. Ask the strategy for an entry decision.
//! 2. On acceptance, resolve the delayed entry fill.
//! 3. Resolve the exit from the fill tick, then the delayed exit fill.
//! 4. Settle P&L, record the position, and jump past the exit fill.
//!
//! Positions never overlap: the next candidate is always after the previous
//! exit fill.

use tracing::debug;

use crate::components::{EntryOutcome, Strategy};
use crate::domain::{Position, Tick};

use super::accounting::{position_size, settle};
use super::fill::price_at_time;
use super::state::{EngineConfig, ExecutionConfig, RunResult};

/// Run the configured rule strategy over one tape.
pub fn run(tape: &[Tick], config: &EngineConfig) -> Vec<Position> {
    let strategy = config.strategy();
    run_backtest(tape, &strategy, &config.execution).positions
}

/// Run any strategy over one tape.
pub fn run_backtest(
    tape: &[Tick],
    strategy: &dyn Strategy,
    execution: &ExecutionConfig,
) -> RunResult {
    let mut result = RunResult {
        tick_count: tape.len(),
        ..RunResult::default()
    };
    if tape.len() < execution.min_tape_len.max(1) {
        return result;
    }

    let creation_time = tape[0].time_ms;
    let mut cursor = 1;

    while cursor < tape.len() {
        result.candidates_evaluated += 1;
        let features = match strategy.evaluate_entry(tape, cursor, creation_time) {
            EntryOutcome::Accepted(features) => features,
            EntryOutcome::Rejected(_) => {
                cursor += 1;
                continue;
            }
        };

        let signal_time = tape[cursor].time_ms;
        let entry_time = signal_time + execution.buy_delay_ms;
        let (entry_price, entry_index) = price_at_time(tape, entry_time, cursor);
        if entry_price <= 0.0 {
            debug!(cursor, entry_index, "dropping entry with non-positive fill price");
            result.dropped_signals += 1;
            cursor += 1;
            continue;
        }

        let exit = strategy.resolve_exit(tape, entry_index, entry_price, entry_time);
        // A sell delay shorter than the buy delay must not close before the fill.
        let exit_time = tape[exit.exit_index].time_ms.max(entry_time) + execution.sell_delay_ms;
        let (exit_price, exit_index) = price_at_time(tape, exit_time, exit.exit_index);

        let size = position_size(tape[entry_index].market_cap(), execution);
        let settlement = settle(size, entry_price, exit_price, execution);

        debug!(
            signal = cursor,
            entry_index,
            exit_index,
            reason = %exit.reason,
            profit_rate = settlement.profit_rate,
            "position closed"
        );

        result.positions.push(Position {
            signal_index: cursor,
            entry_index,
            entry_price,
            entry_time,
            exit_signal_index: exit.exit_index,
            exit_index,
            exit_price,
            exit_time,
            exit_reason: exit.reason,
            size_sol: settlement.size_sol,
            realized_profit_sol: settlement.profit_sol,
            profit_rate: settlement.profit_rate,
            is_profitable: settlement.profit_sol > 0.0,
            features,
        });

        cursor = exit_index + 1;
    }

    result
}
