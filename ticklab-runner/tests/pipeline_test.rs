//! End-to-end: tape file and config file on disk, through the batch runner,
//! into an artifact directory and back.

use std::path::Path;

use ticklab_core::domain::{ExitReason, Tick};
use ticklab_runner::{
    export_trades_csv, generate_report, generate_tapes, load_artifacts, load_tapes, run_batch,
    run_from_files, save_artifacts, tapes_to_value, AssetTapes, BacktestConfig, RunError,
    SyntheticConfig, SCHEMA_VERSION,
};

fn tick(index: u32, time_ms: i64, amount: f64, market_cap: f64) -> Tick {
    Tick {
        index,
        time_ms,
        price: 1.0,
        signed_amount: amount,
        market_cap,
        trader_id: format!("w{}", index % 7),
    }
}

/// Twenty small buys, a qualifying sell at index 20, then a market-cap
/// run-up at a flat price.
fn take_profit_tape() -> Vec<Tick> {
    let mut tape: Vec<Tick> = (0..20).map(|i| tick(i, i as i64 * 1_000, 0.1, 150.0)).collect();
    tape.push(tick(20, 20_000, -5.0, 150.0));
    tape.push(tick(21, 21_000, 0.1, 180.0));
    tape.push(tick(22, 22_000, 0.1, 240.0));
    tape.push(tick(23, 23_000, 0.1, 310.0));
    tape.push(tick(24, 24_000, 0.1, 320.0));
    tape
}

fn write_tapes(dir: &Path, tapes: &AssetTapes) -> std::path::PathBuf {
    let path = dir.join("tapes.json");
    std::fs::write(&path, serde_json::to_string(&tapes_to_value(tapes)).unwrap()).unwrap();
    path
}

#[test]
fn files_to_artifacts_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let tapes: AssetTapes = [("mint_a".to_string(), take_profit_tape())].into_iter().collect();
    let data_path = write_tapes(dir.path(), &tapes);

    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, BacktestConfig::default().to_toml().unwrap()).unwrap();

    let result = run_from_files(&data_path, Some(config_path.as_path())).unwrap();
    assert_eq!(result.schema_version, SCHEMA_VERSION);
    assert_eq!(result.position_count(), 1);
    let (asset, position) = result.positions().next().unwrap();
    assert_eq!(asset, "mint_a");
    assert_eq!(position.exit_reason, ExitReason::MarketCapTakeProfit);

    let run_dir = save_artifacts(&result, &dir.path().join("out")).unwrap();
    assert!(run_dir.join("result.json").exists());
    assert!(run_dir.join("trades.csv").exists());
    assert!(run_dir.join("report.md").exists());

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.config_hash, result.config_hash);
    assert_eq!(loaded.config, result.config);
    assert_eq!(loaded.position_count(), result.position_count());
    assert_eq!(loaded.summary.exit_reasons, result.summary.exit_reasons);
    for ((a_id, a), (b_id, b)) in loaded.positions().zip(result.positions()) {
        assert_eq!(a_id, b_id);
        assert_eq!(a.entry_index, b.entry_index);
        assert_eq!(a.exit_index, b.exit_index);
        assert_eq!(a.exit_reason, b.exit_reason);
        assert!((a.profit_rate - b.profit_rate).abs() < 1e-12);
        assert_eq!(a.features.len(), b.features.len());
    }
}

#[test]
fn missing_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let tapes: AssetTapes = [("a".to_string(), take_profit_tape())].into_iter().collect();
    let data_path = write_tapes(dir.path(), &tapes);
    let result = run_from_files(&data_path, None).unwrap();
    assert_eq!(result.config, BacktestConfig::default());
}

#[test]
fn loader_skips_are_reported_with_run_skips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tapes.json");
    std::fs::write(
        &path,
        r#"{"b_no_data": {"trades": []},
            "a_backwards": {"trade_data": [{"tradetime": 5}, {"tradetime": 1}]},
            "c_ok": {"trade_data": []}}"#,
    )
    .unwrap();
    let result = run_from_files(&path, None).unwrap();
    let skipped: Vec<&str> = result.skipped.iter().map(|s| s.asset.as_str()).collect();
    assert_eq!(skipped, vec!["a_backwards", "b_no_data"]);
    assert!(result.assets.contains_key("c_ok"));
}

#[test]
fn bad_trade_time_mid_tape_still_runs() {
    let dir = tempfile::tempdir().unwrap();
    let tapes: AssetTapes = [("a".to_string(), take_profit_tape())].into_iter().collect();
    let mut value = tapes_to_value(&tapes);
    value["a"]["trade_data"][22]["tradetime"] = serde_json::json!("bad");
    let path = dir.path().join("tapes.json");
    std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    let loaded = load_tapes(&path).unwrap();
    assert_eq!(loaded.tapes["a"][22].time_ms, 21_000);

    let result = run_from_files(&path, None).unwrap();
    assert!(result.skipped.is_empty());
    assert_eq!(result.assets["a"].tick_count, 25);
    assert_eq!(result.position_count(), 1);
    let (_, position) = result.positions().next().unwrap();
    assert_eq!(position.exit_reason, ExitReason::MarketCapTakeProfit);
}

#[test]
fn unreadable_inputs_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    assert!(matches!(run_from_files(&missing, None), Err(RunError::Data(_))));

    let data_path = write_tapes(dir.path(), &AssetTapes::new());
    let bad_config = dir.path().join("bad.toml");
    std::fs::write(&bad_config, "[exit]\nmax_hold_seconds = \"soon\"\n").unwrap();
    assert!(matches!(
        run_from_files(&data_path, Some(bad_config.as_path())),
        Err(RunError::Config(_))
    ));
}

#[test]
fn trades_csv_has_one_row_per_position() {
    let tapes: AssetTapes = [
        ("a".to_string(), take_profit_tape()),
        ("b".to_string(), take_profit_tape()),
    ]
    .into_iter()
    .collect();
    let result = run_batch(&tapes, &BacktestConfig::default()).unwrap();
    let csv = export_trades_csv(&result).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 1 + result.position_count());
    assert!(lines[0].starts_with("asset,signal_index,entry_index"));
    assert!(lines[1].starts_with("a,20,20,"));
    assert!(lines[1].contains("market_cap_take_profit"));
}

#[test]
fn report_covers_summary_and_buckets() {
    let tapes: AssetTapes = [("a".to_string(), take_profit_tape())].into_iter().collect();
    let result = run_batch(&tapes, &BacktestConfig::default()).unwrap();
    let report = generate_report(&result);
    assert!(report.starts_with("# Backtest Report"));
    assert!(report.contains(&result.config_hash));
    assert!(report.contains("## Exit Reasons"));
    assert!(report.contains("## Condition Buckets"));
}

#[test]
fn synthetic_batches_are_deterministic() {
    let config = SyntheticConfig {
        ticks_per_asset: 1_500,
        ..SyntheticConfig::default()
    };
    let tapes = generate_tapes(6, &config);
    let first = run_batch(&tapes, &BacktestConfig::default()).unwrap();
    let second = run_batch(&tapes, &BacktestConfig::default()).unwrap();
    assert_eq!(first.assets, second.assets);
    assert_eq!(first.summary.total_trades, second.summary.total_trades);
    assert_eq!(first.summary.exit_reasons, second.summary.exit_reasons);
    assert!(first.skipped.is_empty());
}
