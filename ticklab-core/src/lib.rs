//! TickLab Core: tick-tape backtest engine.
//!
//! This crate contains the simulation itself, with no I/O:
//! - Domain types (ticks, positions, exit reasons, feature snapshots)
//! - Feature engine: pure backward-looking window statistics
//! - Entry evaluation: hard filters plus mode-gated conditions
//! - Exit state machine with retracement inflection detection
//! - Sequential per-asset driver with delayed fills and fee accounting
//! - Bucketed outcome analytics with additive merge

pub mod analytics;
pub mod components;
pub mod domain;
pub mod engine;
pub mod features;

pub use analytics::{Aggregator, AnalyticsConfig, AnalyticsSummary, BucketStat, DebugRecord};
pub use components::{EntryConfig, EntryOutcome, ExitConfig, RuleStrategy, Strategy};
pub use domain::{ExitReason, FeatureSnapshot, Position, Tick};
pub use engine::{run, run_backtest, EngineConfig, ExecutionConfig, RunResult};
