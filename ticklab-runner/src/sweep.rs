//! Parameter sweep over a grid of configuration overrides.
//!
//! A grid is a list of axes. Each axis names a dotted path into the
//! serialized `BacktestConfig` (`exit.loss_stop.loss_fraction`,
//! `entry.conditions.2.mode`) and the values to try there. The sweep runs the
//! cartesian product, last axis varying fastest, and ranks candidates by total
//! profit.
//!
//! Candidates are checked against `FilterThresholds`; `passing()` keeps the
//! ones that clear every threshold.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use ticklab_core::analytics::AnalyticsSummary;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::AssetTapes;
use crate::metrics::SummaryStats;
use crate::runner::{run_batch, RunError};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("failed to read grid '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid grid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("axis '{path}' has no values")]
    EmptyAxis { path: String },

    #[error("unknown parameter path '{path}'")]
    UnknownPath { path: String },

    #[error("failed to encode config: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("override {params} does not fit the config: {source}")]
    Rebuild {
        params: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("override produced an invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("run failed: {0}")]
    Run(#[from] RunError),
}

// ─── Grid ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamAxis {
    pub path: String,
    pub values: Vec<Value>,
}

/// One override in a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSetting {
    pub path: String,
    pub value: Value,
}

/// Sweep-wide acceptance criteria. A candidate passes when it meets all four.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterThresholds {
    pub min_profitable_trades: usize,
    pub min_total_profit_sol: f64,
    pub min_win_rate: f64,
    pub min_avg_profit_rate: f64,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            min_profitable_trades: 500,
            min_total_profit_sol: 2.0,
            min_win_rate: 0.35,
            min_avg_profit_rate: 0.005,
        }
    }
}

impl FilterThresholds {
    pub fn passes(&self, stats: &SummaryStats) -> bool {
        stats.profitable_trades >= self.min_profitable_trades
            && stats.total_profit_sol >= self.min_total_profit_sol
            && stats.win_rate >= self.min_win_rate
            && stats.avg_profit_rate >= self.min_avg_profit_rate
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub axes: Vec<ParamAxis>,
    pub thresholds: FilterThresholds,
}

impl ParamGrid {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SweepError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SweepError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SweepError> {
        let grid: Self = toml::from_str(text)?;
        if let Some(axis) = grid.axes.iter().find(|a| a.values.is_empty()) {
            return Err(SweepError::EmptyAxis {
                path: axis.path.clone(),
            });
        }
        Ok(grid)
    }

    pub fn axis(mut self, path: impl Into<String>, values: Vec<Value>) -> Self {
        self.axes.push(ParamAxis {
            path: path.into(),
            values,
        });
        self
    }

    /// Number of candidates. A grid with no axes has one: the base config.
    pub fn size(&self) -> usize {
        self.axes.iter().map(|a| a.values.len()).product()
    }

    /// Every combination, last axis varying fastest.
    pub fn combinations(&self) -> Vec<Vec<ParamSetting>> {
        let mut combos: Vec<Vec<ParamSetting>> = vec![Vec::new()];
        for axis in &self.axes {
            combos = combos
                .into_iter()
                .flat_map(|prefix| {
                    axis.values.iter().map(move |value| {
                        let mut combo = prefix.clone();
                        combo.push(ParamSetting {
                            path: axis.path.clone(),
                            value: value.clone(),
                        });
                        combo
                    })
                })
                .collect();
        }
        combos
    }
}

/// Apply overrides to `base` and return the validated result.
pub fn apply_overrides(
    base: &BacktestConfig,
    settings: &[ParamSetting],
) -> Result<BacktestConfig, SweepError> {
    let mut tree = serde_json::to_value(base).map_err(SweepError::Encode)?;
    for setting in settings {
        let slot = lookup_mut(&mut tree, &setting.path).ok_or_else(|| SweepError::UnknownPath {
            path: setting.path.clone(),
        })?;
        *slot = setting.value.clone();
    }
    let config: BacktestConfig =
        serde_json::from_value(tree).map_err(|source| SweepError::Rebuild {
            params: format_params(settings),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

fn lookup_mut<'a>(tree: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.').try_fold(tree, |node, segment| match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    })
}

/// `path=value, path=value`
pub fn format_params(settings: &[ParamSetting]) -> String {
    settings
        .iter()
        .map(|s| format!("{}={}", s.path, s.value))
        .collect::<Vec<_>>()
        .join(", ")
}

// ─── Execution ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepCandidate {
    /// Position in grid order.
    pub id: usize,
    pub params: Vec<ParamSetting>,
    pub config_hash: String,
    pub summary: SummaryStats,
    pub passed: bool,
}

/// Run every grid combination over the same tapes.
///
/// Overrides are applied and validated up front, so a bad path fails the
/// sweep before any backtest runs.
pub fn run_sweep(
    tapes: &AssetTapes,
    base: &BacktestConfig,
    grid: &ParamGrid,
) -> Result<SweepResults, SweepError> {
    let candidates: Vec<(usize, Vec<ParamSetting>, BacktestConfig)> = grid
        .combinations()
        .into_iter()
        .enumerate()
        .map(|(id, params)| -> Result<_, SweepError> {
            let config = apply_overrides(base, &params)?;
            Ok((id, params, config))
        })
        .collect::<Result<_, SweepError>>()?;

    info!(candidates = candidates.len(), assets = tapes.len(), "starting sweep");

    let results = candidates
        .into_par_iter()
        .map(|(id, params, config)| -> Result<SweepCandidate, SweepError> {
            let batch = run_batch(tapes, &config)?;
            let passed = grid.thresholds.passes(&batch.summary);
            Ok(SweepCandidate {
                id,
                params,
                config_hash: batch.config_hash,
                summary: batch.summary,
                passed,
            })
        })
        .collect::<Result<Vec<_>, SweepError>>()?;

    let results = SweepResults::new(results);
    info!(
        candidates = results.len(),
        passing = results.passing().len(),
        "sweep complete"
    );
    Ok(results)
}

/// Sweep candidates ranked by total profit, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResults {
    candidates: Vec<SweepCandidate>,
}

impl SweepResults {
    fn new(mut candidates: Vec<SweepCandidate>) -> Self {
        candidates.sort_by(|a, b| {
            b.summary
                .total_profit_sol
                .partial_cmp(&a.summary.total_profit_sol)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        Self { candidates }
    }

    pub fn all(&self) -> &[SweepCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn passing(&self) -> Vec<&SweepCandidate> {
        self.candidates.iter().filter(|c| c.passed).collect()
    }

    pub fn top_n(&self, n: usize) -> Vec<&SweepCandidate> {
        self.candidates.iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&SweepCandidate> {
        self.candidates.first()
    }
}

// ─── Range suggestion ───────────────────────────────────────────────

/// A condition range covering every bucket with a positive average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSuggestion {
    pub condition: String,
    pub min: f64,
    /// `None` when the top open-ended bucket is included.
    pub max: Option<f64>,
}

/// Walk conditions in `order` and suggest a range from the first one whose
/// buckets show a positive trimmed average.
pub fn suggest_range(summary: &AnalyticsSummary, order: &[&str]) -> Option<RangeSuggestion> {
    order.iter().find_map(|name| {
        let stats = summary.conditions.get(*name)?;
        let profitable: Vec<_> = stats
            .iter()
            .filter(|s| s.count > 0 && s.avg_profit_rate > 0.0)
            .collect();
        if profitable.is_empty() {
            return None;
        }
        let min = profitable
            .iter()
            .map(|s| s.bucket_low.unwrap_or(f64::NEG_INFINITY))
            .fold(f64::INFINITY, f64::min);
        let max = if profitable.iter().any(|s| s.bucket_high.is_none()) {
            None
        } else {
            profitable
                .iter()
                .filter_map(|s| s.bucket_high)
                .reduce(f64::max)
        };
        Some(RangeSuggestion {
            condition: name.to_string(),
            min,
            max,
        })
    })
}
