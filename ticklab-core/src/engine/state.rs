//! Engine configuration and run result types.

use serde::{Deserialize, Serialize};

use crate::components::{EntryConfig, ExitConfig, RuleStrategy};
use crate::domain::Position;

/// Tapes shorter than this produce no positions.
pub const MIN_TAPE_LEN: usize = 20;

/// Execution model: fill delays, position sizing, and fees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Delay between the entry signal and the fill.
    pub buy_delay_ms: i64,
    /// Delay between the exit signal and the fill.
    pub sell_delay_ms: i64,
    /// Size = max(size_coefficient * sqrt(market_cap) + size_intercept, min_size_sol).
    pub size_coefficient: f64,
    pub size_intercept: f64,
    pub min_size_sol: f64,
    /// Fee per leg = amount * fee_rate + fee_fixed_sol.
    pub fee_rate: f64,
    pub fee_fixed_sol: f64,
    pub min_tape_len: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            buy_delay_ms: 200,
            sell_delay_ms: 200,
            size_coefficient: 0.1085,
            size_intercept: -0.0973,
            min_size_sol: 0.205,
            fee_rate: 0.0125,
            fee_fixed_sol: 0.0001,
            min_tape_len: MIN_TAPE_LEN,
        }
    }
}

impl ExecutionConfig {
    /// No delays and no fees. Useful for exact index assertions.
    pub fn immediate() -> Self {
        Self {
            buy_delay_ms: 0,
            sell_delay_ms: 0,
            fee_rate: 0.0,
            fee_fixed_sol: 0.0,
            ..Self::default()
        }
    }
}

/// Everything a single-asset run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub entry: EntryConfig,
    pub exit: ExitConfig,
    pub execution: ExecutionConfig,
}

impl EngineConfig {
    pub fn new(entry: EntryConfig, exit: ExitConfig, execution: ExecutionConfig) -> Self {
        Self {
            entry,
            exit,
            execution,
        }
    }

    /// The rule strategy described by the entry and exit sections.
    pub fn strategy(&self) -> RuleStrategy {
        RuleStrategy::new(self.entry.clone(), self.exit.clone())
    }
}

/// Output of a single-asset run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub positions: Vec<Position>,
    pub tick_count: usize,
    /// Candidates evaluated by the entry rules.
    pub candidates_evaluated: usize,
    /// Accepted entries that were dropped because the fill price was not positive.
    pub dropped_signals: usize,
}
