//! Strategy components: entry conditions, entry evaluation, exit rules.
//!
//! A strategy is an entry evaluator plus an exit resolver:
//! - Conditions: mode-gated feature checks (Off / Online / Debug)
//! - Entry: hard filters followed by the configured condition list
//! - Exit: the forward-scanning exit state machine
//! - Strategy: the trait the driver calls, and its rule-based implementation

pub mod condition;
pub mod entry;
pub mod exit;
pub mod strategy;

pub use condition::{default_conditions, Bounds, ConditionKind, ConditionMode, ConditionSpec};
pub use entry::{
    EntryConfig, EntryOutcome, HardFilters, Rejection, TradeDirection, TrailingSumFilter,
};
pub use exit::{
    ExitConfig, ExitSignal, ExitTracker, LossStopRule, ProfitTakeRule, QuietPeriodRule,
    ReboundRule, RetracementRule, SellPressureRule, SpikeRule,
};
pub use strategy::{RuleStrategy, Strategy};
