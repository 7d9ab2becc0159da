//! Sweep and analytics behaviour over synthetic tapes.
//!
//! Tests:
//! 1. A grid runs every combination and ranks by total profit.
//! 2. Each candidate equals a plain batch run of its overridden config.
//! 3. Grid files load from disk; unknown paths fail before any run.
//! 4. Parallel analytics match a sequential per-asset pass.
//! 5. Positions stay ordered and disjoint for any synthetic seed.

use proptest::prelude::*;
use serde_json::json;

use ticklab_core::analytics::Aggregator;
use ticklab_runner::{
    apply_overrides, export_sweep_csv, generate_sweep_report, generate_tapes, run_batch,
    run_sweep, AssetTapes, BacktestConfig, FilterThresholds, ParamGrid, SweepError,
    SyntheticConfig,
};

fn tapes(assets: usize, ticks: usize, seed: u64) -> AssetTapes {
    generate_tapes(
        assets,
        &SyntheticConfig {
            ticks_per_asset: ticks,
            seed,
            ..SyntheticConfig::default()
        },
    )
}

// ── 1. Ranking ──

#[test]
fn grid_runs_every_combination_ranked() {
    let tapes = tapes(4, 1_200, 1);
    let grid = ParamGrid::default()
        .axis("exit.loss_stop.loss_fraction", vec![json!(0.2), json!(0.4)])
        .axis("exit.max_hold_seconds", vec![json!(60.0), json!(600.0)]);
    let results = run_sweep(&tapes, &BacktestConfig::default(), &grid).unwrap();

    assert_eq!(results.len(), 4);
    let profits: Vec<f64> = results
        .all()
        .iter()
        .map(|c| c.summary.total_profit_sol)
        .collect();
    assert!(profits.windows(2).all(|w| w[0] >= w[1]));
    let mut ids: Vec<usize> = results.all().iter().map(|c| c.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2, 3]);
    assert_eq!(results.best().map(|c| c.id), results.all().first().map(|c| c.id));
}

// ── 2. Candidates match plain runs ──

#[test]
fn candidate_matches_batch_run() {
    let tapes = tapes(3, 1_000, 2);
    let base = BacktestConfig::default();
    let grid = ParamGrid::default().axis("exit.take_profit_market_cap", vec![json!(220.0)]);
    let results = run_sweep(&tapes, &base, &grid).unwrap();
    let candidate = &results.all()[0];

    let config = apply_overrides(&base, &candidate.params).unwrap();
    assert_eq!(config.exit.take_profit_market_cap, 220.0);
    let batch = run_batch(&tapes, &config).unwrap();
    assert_eq!(candidate.config_hash, batch.config_hash);
    assert_eq!(candidate.summary.total_trades, batch.summary.total_trades);
    assert_eq!(candidate.summary.exit_reasons, batch.summary.exit_reasons);
}

#[test]
fn impossible_thresholds_pass_nothing() {
    let tapes = tapes(2, 800, 3);
    let grid = ParamGrid {
        thresholds: FilterThresholds {
            min_profitable_trades: usize::MAX,
            ..FilterThresholds::default()
        },
        ..ParamGrid::default()
    };
    let results = run_sweep(&tapes, &BacktestConfig::default(), &grid).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results.passing().is_empty());

    let csv = export_sweep_csv(&results).unwrap();
    assert_eq!(csv.lines().count(), 2);
    let report = generate_sweep_report(&results, 10);
    assert!(report.contains("(base)"));
    assert!(report.contains("0 passing"));
}

// ── 3. Grid files ──

#[test]
fn grid_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.toml");
    std::fs::write(
        &path,
        r#"
[thresholds]
min_profitable_trades = 1

[[axes]]
path = "exit.loss_stop.loss_fraction"
values = [0.25, 0.35]

[[axes]]
path = "entry.conditions.0.mode"
values = ["off", "debug"]
"#,
    )
    .unwrap();
    let grid = ParamGrid::from_file(&path).unwrap();
    assert_eq!(grid.size(), 4);
    assert_eq!(grid.thresholds.min_profitable_trades, 1);
    assert_eq!(grid.thresholds.min_win_rate, FilterThresholds::default().min_win_rate);
}

#[test]
fn bad_paths_fail_before_running() {
    let grid = ParamGrid::default().axis("exit.no_such_rule", vec![json!(1)]);
    let err = run_sweep(&tapes(1, 100, 4), &BacktestConfig::default(), &grid).unwrap_err();
    assert!(matches!(err, SweepError::UnknownPath { .. }));
}

// ── 4. Parallel analytics ──

#[test]
fn parallel_analytics_match_sequential_pass() {
    let tapes = tapes(8, 1_500, 5);
    let config = BacktestConfig::default();
    let result = run_batch(&tapes, &config).unwrap();
    let parallel = result.analytics.as_ref().unwrap();

    let mut sequential = Aggregator::new(&config.analytics_config());
    for (_, p) in result.positions() {
        sequential.ingest_position(p);
    }
    let sequential = sequential.summarize();

    assert_eq!(parallel.total_records, sequential.total_records);
    assert_eq!(parallel.win_count, sequential.win_count);
    assert_eq!(parallel.trimmed_records, sequential.trimmed_records);
    assert!((parallel.avg_profit_rate - sequential.avg_profit_rate).abs() < 1e-9);
    assert_eq!(parallel.conditions.len(), sequential.conditions.len());
    for (name, buckets) in &parallel.conditions {
        let other = &sequential.conditions[name];
        assert_eq!(buckets.len(), other.len());
        for (a, b) in buckets.iter().zip(other) {
            assert_eq!(a.label, b.label);
            assert_eq!(a.count, b.count);
            assert_eq!(a.win_count, b.win_count);
            assert!((a.avg_profit_rate - b.avg_profit_rate).abs() < 1e-9);
        }
    }
}

// ── 5. Batch properties ──

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn batch_positions_are_ordered_per_asset(seed in 0u64..1_000, assets in 1usize..4) {
        let tapes = tapes(assets, 600, seed);
        let result = run_batch(&tapes, &BacktestConfig::default()).unwrap();
        prop_assert!(result.skipped.is_empty());
        for run in result.assets.values() {
            for pair in run.positions.windows(2) {
                prop_assert!(pair[1].signal_index > pair[0].exit_index);
            }
            for p in &run.positions {
                prop_assert!(p.entry_index >= p.signal_index);
                prop_assert!(p.exit_index >= p.exit_signal_index);
                prop_assert!(p.exit_time >= p.entry_time);
            }
        }
        prop_assert_eq!(result.summary.total_trades, result.position_count());
    }
}
