//! Backtest driver: the sequential per-asset loop and its supporting pieces.
//!
//! - `state`: engine and execution configuration, run result
//! - `fill`: delayed fill resolution
//! - `accounting`: sizing, fees, realized P&L
//! - `loop_runner`: the driver loop

pub mod accounting;
pub mod fill;
pub mod loop_runner;
pub mod state;

pub use accounting::{fee, position_size, settle, Settlement};
pub use fill::price_at_time;
pub use loop_runner::{run, run_backtest};
pub use state::{EngineConfig, ExecutionConfig, RunResult, MIN_TAPE_LEN};
