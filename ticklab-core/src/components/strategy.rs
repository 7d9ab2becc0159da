//! Strategy abstraction: an entry evaluator paired with an exit resolver.
//!
//! The driver only talks to `Strategy`. `RuleStrategy` is the configured
//! implementation; alternative strategies plug in without touching the loop.

use serde::{Deserialize, Serialize};

use super::entry::{self, EntryConfig, EntryOutcome};
use super::exit::{self, ExitConfig, ExitSignal};
use crate::domain::Tick;

/// Trait for complete trading strategies.
///
/// # Contract
/// - `evaluate_entry` only reads `tape[..=candidate]`.
/// - `resolve_exit` returns an index at or after `entry_index`.
/// - Neither method keeps state between calls.
pub trait Strategy: Send + Sync {
    /// Human-readable name (e.g., "rule_strategy").
    fn name(&self) -> &str;

    fn evaluate_entry(&self, tape: &[Tick], candidate: usize, creation_time_ms: i64)
        -> EntryOutcome;

    fn resolve_exit(
        &self,
        tape: &[Tick],
        entry_index: usize,
        entry_price: f64,
        entry_time: i64,
    ) -> ExitSignal;
}

/// Strategy driven entirely by configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleStrategy {
    pub entry: EntryConfig,
    pub exit: ExitConfig,
}

impl RuleStrategy {
    pub fn new(entry: EntryConfig, exit: ExitConfig) -> Self {
        Self { entry, exit }
    }
}

impl Strategy for RuleStrategy {
    fn name(&self) -> &str {
        "rule_strategy"
    }

    fn evaluate_entry(
        &self,
        tape: &[Tick],
        candidate: usize,
        creation_time_ms: i64,
    ) -> EntryOutcome {
        entry::evaluate(tape, candidate, creation_time_ms, &self.entry)
    }

    fn resolve_exit(
        &self,
        tape: &[Tick],
        entry_index: usize,
        entry_price: f64,
        entry_time: i64,
    ) -> ExitSignal {
        exit::resolve(tape, entry_index, entry_price, entry_time, &self.exit)
    }
}
