//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for batch results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: one row per position, and one row per sweep candidate
//! - **Markdown**: summary, exit-reason breakdown, and per-condition bucket tables
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::DateTime;

use ticklab_core::analytics::AnalyticsSummary;

use crate::runner::{BatchResult, SCHEMA_VERSION};
use crate::sweep::{format_params, SweepResults};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BatchResult` to pretty JSON.
pub fn export_json(result: &BatchResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BatchResult to JSON")
}

/// Deserialize a `BatchResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BatchResult> {
    let result: BatchResult =
        serde_json::from_str(json).context("failed to deserialize BatchResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per position, assets in id order.
///
/// Columns: asset, signal_index, entry_index, entry_time, entry_price,
/// exit_signal_index, exit_index, exit_time, exit_price, exit_reason,
/// holding_ms, size_sol, profit_sol, profit_rate, is_profitable
pub fn export_trades_csv(result: &BatchResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "asset",
        "signal_index",
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_signal_index",
        "exit_index",
        "exit_time",
        "exit_price",
        "exit_reason",
        "holding_ms",
        "size_sol",
        "profit_sol",
        "profit_rate",
        "is_profitable",
    ])?;

    for (asset, p) in result.positions() {
        wtr.write_record([
            &asset.to_string(),
            &p.signal_index.to_string(),
            &p.entry_index.to_string(),
            &format_time(p.entry_time),
            &format!("{:.10}", p.entry_price),
            &p.exit_signal_index.to_string(),
            &p.exit_index.to_string(),
            &format_time(p.exit_time),
            &format!("{:.10}", p.exit_price),
            &p.exit_reason.to_string(),
            &p.holding_ms().to_string(),
            &format!("{:.6}", p.size_sol),
            &format!("{:.6}", p.realized_profit_sol),
            &format!("{:.6}", p.profit_rate),
            &p.is_profitable.to_string(),
        ])?;
    }

    let bytes = wtr.into_inner().context("failed to flush trades CSV")?;
    String::from_utf8(bytes).context("trades CSV is not UTF-8")
}

/// One row per sweep candidate, in ranking order.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "id",
        "params",
        "config_hash",
        "total_trades",
        "profitable_trades",
        "win_rate",
        "total_profit_sol",
        "avg_profit_rate",
        "passed",
    ])?;
    for (rank, c) in results.all().iter().enumerate() {
        let s = &c.summary;
        wtr.write_record([
            &(rank + 1).to_string(),
            &c.id.to_string(),
            &format_params(&c.params),
            &c.config_hash,
            &s.total_trades.to_string(),
            &s.profitable_trades.to_string(),
            &format!("{:.4}", s.win_rate),
            &format!("{:.6}", s.total_profit_sol),
            &format!("{:.6}", s.avg_profit_rate),
            &c.passed.to_string(),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush sweep CSV")?;
    String::from_utf8(bytes).context("sweep CSV is not UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `result.json`, `trades.csv`, and `report.md` into a subdirectory of
/// `output_dir` named after the config hash. Returns the subdirectory.
pub fn save_artifacts(result: &BatchResult, output_dir: &Path) -> Result<PathBuf> {
    let short = result.config_hash.get(..12).unwrap_or(&result.config_hash);
    let run_dir = output_dir.join(format!("run_{short}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    std::fs::write(run_dir.join("result.json"), &json)?;

    let trades_csv = export_trades_csv(result)?;
    std::fs::write(run_dir.join("trades.csv"), &trades_csv)?;

    std::fs::write(run_dir.join("report.md"), generate_report(result))?;

    Ok(run_dir)
}

/// Load a `BatchResult` from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<BatchResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Full single-run report.
pub fn generate_report(result: &BatchResult) -> String {
    let mut md = String::with_capacity(4096);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Config Hash | `{}` |\n", result.config_hash));
    md.push_str(&format!("| Assets Run | {} |\n", result.assets.len()));
    md.push_str(&format!("| Assets Skipped | {} |\n", result.skipped.len()));
    let ticks: usize = result.assets.values().map(|a| a.tick_count).sum();
    md.push_str(&format!("| Ticks | {ticks} |\n"));
    md.push('\n');

    let s = &result.summary;
    md.push_str("## Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trades | {} |\n", s.total_trades));
    md.push_str(&format!("| Profitable | {} |\n", s.profitable_trades));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", s.win_rate * 100.0));
    md.push_str(&format!("| Total Profit | {:.4} SOL |\n", s.total_profit_sol));
    md.push_str(&format!("| Avg Profit | {:.4} SOL |\n", s.avg_profit_sol));
    md.push_str(&format!(
        "| Avg Profit Rate | {:.2}% |\n",
        s.avg_profit_rate * 100.0
    ));
    md.push_str(&format!(
        "| Outliers Excluded | {} (rate >= {:.0}%) |\n",
        s.excluded_outliers,
        result.config.analytics.outlier_ceiling * 100.0
    ));
    md.push_str(&format!("| Assets With Trades | {} |\n", s.assets_with_trades));
    md.push('\n');

    if !s.exit_reasons.is_empty() {
        md.push_str("## Exit Reasons\n\n");
        md.push_str("| Reason | Count | Share |\n");
        md.push_str("| --- | ---: | ---: |\n");
        for (reason, count) in s.exit_reasons_by_count() {
            md.push_str(&format!(
                "| {} | {} | {:.1}% |\n",
                reason,
                count,
                share(count, s.total_trades)
            ));
        }
        md.push('\n');
    }

    if let Some(analytics) = &result.analytics {
        md.push_str(&format_analytics(analytics));
    }

    if !result.skipped.is_empty() {
        md.push_str("## Skipped Assets\n\n");
        for skipped in &result.skipped {
            md.push_str(&format!("- `{}`: {}\n", skipped.asset, skipped.reason));
        }
        md.push('\n');
    }

    md
}

/// Per-condition bucket tables.
pub fn format_analytics(analytics: &AnalyticsSummary) -> String {
    let mut md = String::new();
    md.push_str("## Condition Buckets\n\n");
    md.push_str(&format!(
        "{} records, {} in averages, win rate {:.1}%, avg profit rate {:.2}%\n\n",
        analytics.total_records,
        analytics.trimmed_records,
        analytics.win_rate * 100.0,
        analytics.avg_profit_rate * 100.0
    ));

    for (name, buckets) in &analytics.conditions {
        md.push_str(&format!("### {name}\n\n"));
        md.push_str("| Bucket | Count | Wins | Win Rate | Avg Profit Rate |\n");
        md.push_str("| --- | ---: | ---: | ---: | ---: |\n");
        for b in buckets {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% | {:.2}% |\n",
                b.label,
                b.count,
                b.win_count,
                b.win_rate() * 100.0,
                b.avg_profit_rate * 100.0
            ));
        }
        md.push('\n');
    }
    md
}

/// Ranked sweep table, `limit` rows at most.
pub fn generate_sweep_report(results: &SweepResults, limit: usize) -> String {
    let mut md = String::with_capacity(1024);
    md.push_str("# Sweep Report\n\n");
    md.push_str(&format!(
        "{} candidates, {} passing all thresholds\n\n",
        results.len(),
        results.passing().len()
    ));
    md.push_str("| Rank | Params | Trades | Win Rate | Profit (SOL) | Avg Rate | Pass |\n");
    md.push_str("| ---: | --- | ---: | ---: | ---: | ---: | :---: |\n");
    for (rank, c) in results.top_n(limit).into_iter().enumerate() {
        let s = &c.summary;
        md.push_str(&format!(
            "| {} | {} | {} | {:.1}% | {:.4} | {:.2}% | {} |\n",
            rank + 1,
            if c.params.is_empty() {
                "(base)".to_string()
            } else {
                format_params(&c.params)
            },
            s.total_trades,
            s.win_rate * 100.0,
            s.total_profit_sol,
            s.avg_profit_rate * 100.0,
            if c.passed { "yes" } else { "no" }
        ));
    }
    md
}

// ─── Helpers ────────────────────────────────────────────────────────

/// RFC 3339 in UTC, or the raw milliseconds when out of range.
fn format_time(time_ms: i64) -> String {
    DateTime::from_timestamp_millis(time_ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| time_ms.to_string())
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}
