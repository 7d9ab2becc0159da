//! Batch runner: every asset tape through the engine, in parallel.
//!
//! Two entry points:
//! - `run_batch()`: pre-loaded tapes plus a configuration. No I/O.
//! - `run_from_files()`: loads the tape file and an optional config file.
//!
//! Assets are independent. Each rayon worker owns an `Aggregator`; workers
//! merge additively at the end, so the analytics equal a sequential pass.

use std::collections::BTreeMap;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use ticklab_core::analytics::{Aggregator, AnalyticsSummary};
use ticklab_core::domain::{validate_tape, Position, Tick};
use ticklab_core::engine::run_backtest;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_tapes, AssetTapes, LoadError};
use crate::metrics::SummaryStats;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// One asset's run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRun {
    pub tick_count: usize,
    pub candidates_evaluated: usize,
    pub dropped_signals: usize,
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedAsset {
    pub asset: String,
    pub reason: String,
}

/// Complete result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config_hash: String,
    pub config: BacktestConfig,
    pub assets: BTreeMap<String, AssetRun>,
    pub skipped: Vec<SkippedAsset>,
    pub summary: SummaryStats,
    /// Present when at least one condition records features.
    pub analytics: Option<AnalyticsSummary>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BatchResult {
    pub fn position_count(&self) -> usize {
        self.assets.values().map(|a| a.positions.len()).sum()
    }

    /// Every position with its asset id, in asset order.
    pub fn positions(&self) -> impl Iterator<Item = (&str, &Position)> {
        self.assets
            .iter()
            .flat_map(|(id, run)| run.positions.iter().map(move |p| (id.as_str(), p)))
    }
}

enum AssetOutcome {
    Ran(AssetRun),
    Skipped(String),
}

/// Run every tape in `tapes` with `config`.
///
/// Tapes that fail validation are skipped with a warning and listed in the
/// result; they never abort the batch.
pub fn run_batch(tapes: &AssetTapes, config: &BacktestConfig) -> Result<BatchResult, RunError> {
    config.validate()?;
    let engine = config.engine();
    let strategy = engine.strategy();
    let analytics_config = config.analytics_config();
    let records_features = config.entry.records_features();

    let entries: Vec<(&String, &Vec<Tick>)> = tapes.iter().collect();

    let (outcomes, aggregator) = entries
        .par_iter()
        .fold(
            || (Vec::new(), Aggregator::new(&analytics_config)),
            |(mut outcomes, mut agg), (asset, tape)| {
                let outcome = match validate_tape(tape) {
                    Err(e) => {
                        warn!(asset = %asset, error = %e, "skipping invalid tape");
                        AssetOutcome::Skipped(e.to_string())
                    }
                    Ok(()) => {
                        let run = run_backtest(tape, &strategy, &engine.execution);
                        for p in &run.positions {
                            agg.ingest_position(p);
                        }
                        AssetOutcome::Ran(AssetRun {
                            tick_count: run.tick_count,
                            candidates_evaluated: run.candidates_evaluated,
                            dropped_signals: run.dropped_signals,
                            positions: run.positions,
                        })
                    }
                };
                outcomes.push(((*asset).clone(), outcome));
                (outcomes, agg)
            },
        )
        .reduce(
            || (Vec::new(), Aggregator::new(&analytics_config)),
            |(mut left, mut left_agg), (right, right_agg)| {
                left.extend(right);
                left_agg.merge(&right_agg);
                (left, left_agg)
            },
        );

    let mut assets = BTreeMap::new();
    let mut skipped = Vec::new();
    for (asset, outcome) in outcomes {
        match outcome {
            AssetOutcome::Ran(run) => {
                assets.insert(asset, run);
            }
            AssetOutcome::Skipped(reason) => skipped.push(SkippedAsset { asset, reason }),
        }
    }
    skipped.sort_by(|a, b| a.asset.cmp(&b.asset));

    let summary = SummaryStats::compute(
        assets.values().map(|a| a.positions.as_slice()),
        config.analytics.outlier_ceiling,
    );
    info!(
        assets = assets.len(),
        skipped = skipped.len(),
        trades = summary.total_trades,
        win_rate = summary.win_rate,
        total_profit_sol = summary.total_profit_sol,
        "batch complete"
    );

    Ok(BatchResult {
        schema_version: SCHEMA_VERSION,
        config_hash: config.config_hash(),
        config: config.clone(),
        assets,
        skipped,
        summary,
        analytics: records_features.then(|| aggregator.summarize()),
    })
}

/// Load the tape file (and config file, if given) and run the batch.
pub fn run_from_files(
    data_path: impl AsRef<Path>,
    config_path: Option<&Path>,
) -> Result<BatchResult, RunError> {
    let config = match config_path {
        Some(path) => BacktestConfig::from_file(path)?,
        None => BacktestConfig::default(),
    };
    let loaded = load_tapes(data_path)?;
    let mut result = run_batch(&loaded.tapes, &config)?;
    // Assets dropped by the loader come first; both lists stay sorted.
    let mut skipped: Vec<SkippedAsset> = loaded
        .report
        .skipped
        .into_iter()
        .map(|(asset, reason)| SkippedAsset { asset, reason })
        .collect();
    skipped.append(&mut result.skipped);
    skipped.sort_by(|a, b| a.asset.cmp(&b.asset));
    result.skipped = skipped;
    Ok(result)
}
