//! TickLab Runner: batch orchestration, sweeps, metrics, and export.
//!
//! This crate builds on `ticklab-core` to provide:
//! - TOML configuration with validation and content hashing
//! - Tape loading from the per-asset JSON format
//! - Parallel batch runs with merged debug analytics
//! - Summary metrics with outlier trimming
//! - Parameter sweeps with acceptance thresholds
//! - JSON, CSV, and Markdown artifacts
//! - Deterministic synthetic tapes

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;
pub mod synthetic;

pub use config::{AnalyticsSettings, BacktestConfig, ConfigError};
pub use data_loader::{
    load_tapes, parse_tapes, tapes_from_value, tapes_to_value, AssetTapes, LoadError, LoadReport,
    LoadedTapes,
};
pub use export::{
    export_json, export_sweep_csv, export_trades_csv, generate_report, generate_sweep_report,
    import_json, load_artifacts, save_artifacts,
};
pub use metrics::SummaryStats;
pub use runner::{
    run_batch, run_from_files, AssetRun, BatchResult, RunError, SkippedAsset, SCHEMA_VERSION,
};
pub use sweep::{
    apply_overrides, run_sweep, suggest_range, FilterThresholds, ParamAxis, ParamGrid,
    ParamSetting, RangeSuggestion, SweepCandidate, SweepError, SweepResults,
};
pub use synthetic::{generate_tape, generate_tapes, SyntheticConfig};
