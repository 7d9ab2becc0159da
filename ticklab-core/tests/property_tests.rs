//! Property-based tests for engine invariants.
//!
//! Invariants tested:
//! 1. Tapes shorter than the minimum produce no positions
//! 2. Positions are ordered and never overlap
//! 3. Index 0 is never an entry
//! 4. Constant series have zero volatility
//! 5. Max-amount is vacuously true when nothing qualifies
//! 6. A retracement stop implies the price rose above entry first
//! 7. Bucket counts add up to the records carrying the feature
//! 8. Aggregator merge equals single-pass ingestion

use proptest::prelude::*;

use ticklab_core::analytics::{Aggregator, AnalyticsConfig, DebugRecord};
use ticklab_core::components::entry::evaluate;
use ticklab_core::components::{
    Bounds, EntryConfig, EntryOutcome, HardFilters, TradeDirection, TrailingSumFilter,
};
use ticklab_core::domain::{ExitReason, FeatureSnapshot, Tick};
use ticklab_core::engine::{run, EngineConfig, ExecutionConfig};
use ticklab_core::features;

// ── Strategies (proptest) ──

/// (gap ms, price, signed amount) rows turned into a valid tape.
fn arb_tape(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<Tick>> {
    prop::collection::vec(
        (0i64..3_000, 0.5f64..2.0, -12.0f64..12.0, 80.0f64..350.0),
        min_len..max_len,
    )
    .prop_map(|rows| {
        let mut time = 1_000;
        rows.into_iter()
            .enumerate()
            .map(|(i, (gap, price, amount, market_cap))| {
                time += gap;
                Tick {
                    index: i as u32,
                    time_ms: time,
                    price,
                    signed_amount: amount,
                    market_cap,
                    trader_id: String::new(),
                }
            })
            .collect()
    })
}

fn arb_value() -> impl Strategy<Value = f64> {
    -1_000.0f64..1_000.0
}

fn arb_records() -> impl Strategy<Value = Vec<(f64, Option<f64>)>> {
    prop::collection::vec((-0.9f64..3.0, prop::option::of(0.0f64..10.0)), 0..60)
}

/// Entry filters wide enough that most candidates pass.
fn permissive_config() -> EngineConfig {
    let entry = EntryConfig {
        hard: HardFilters {
            min_minutes_from_creation: 0.0,
            market_cap: Bounds(0.0, f64::MAX),
            trade_amount: Bounds(0.0, f64::MAX),
            trailing_sum: TrailingSumFilter {
                min_amount: 0.0,
                count: 0,
                range: Bounds(f64::MIN, f64::MAX),
            },
            direction: TradeDirection::Both,
        },
        ..EntryConfig::default()
    };
    let mut config = EngineConfig {
        entry,
        ..EngineConfig::default()
    };
    config.exit.max_hold_seconds = 5.0;
    config
}

fn to_records(rows: &[(f64, Option<f64>)]) -> Vec<DebugRecord> {
    rows.iter()
        .map(|(rate, value)| {
            let mut features = FeatureSnapshot::new();
            if let Some(v) = value {
                features.insert("x", *v);
            }
            DebugRecord {
                profit_rate: *rate,
                is_profitable: *rate > 0.0,
                features,
            }
        })
        .collect()
}

fn x_config() -> AnalyticsConfig {
    AnalyticsConfig {
        buckets: [("x".to_string(), vec![1.0, 2.5, 5.0, 7.5])].into_iter().collect(),
        outlier_ceiling: 1.0,
    }
}

// ── 1. Minimum history ──

proptest! {
    #[test]
    fn short_tapes_produce_nothing(tape in arb_tape(0, 20)) {
        prop_assert!(run(&tape, &permissive_config()).is_empty());
    }
}

// ── 2. Non-overlap and ordering ──

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn positions_never_overlap(tape in arb_tape(20, 200)) {
        let positions = run(&tape, &permissive_config());
        for p in &positions {
            prop_assert!(p.signal_index >= 1);
            prop_assert!(p.entry_index >= p.signal_index);
            prop_assert!(p.exit_signal_index >= p.entry_index);
            prop_assert!(p.exit_index >= p.exit_signal_index);
            prop_assert!(p.exit_index < tape.len());
            prop_assert!(p.exit_time >= p.entry_time);
        }
        for pair in positions.windows(2) {
            prop_assert!(pair[0].exit_index < pair[1].signal_index);
        }
    }

    #[test]
    fn immediate_fills_stay_on_signal_tick(tape in arb_tape(20, 120)) {
        let mut config = permissive_config();
        config.execution = ExecutionConfig::immediate();
        for p in run(&tape, &config) {
            prop_assert_eq!(p.entry_index, p.signal_index);
            prop_assert_eq!(p.exit_index, p.exit_signal_index);
        }
    }
}

// ── 3. Index 0 ──

proptest! {
    #[test]
    fn index_zero_never_enters(tape in arb_tape(1, 40)) {
        let config = permissive_config();
        let outcome = evaluate(&tape, 0, tape[0].time_ms, &config.entry);
        prop_assert!(!outcome.is_accepted());
    }
}

// ── 4. Volatility of constant series ──

proptest! {
    #[test]
    fn constant_series_has_zero_cv(v in arb_value(), n in 2usize..50) {
        let values = vec![v; n];
        prop_assert_eq!(features::coefficient_of_variation(&values), Some(0.0));
    }

    #[test]
    fn cv_is_never_negative(values in prop::collection::vec(0.01f64..100.0, 2..40)) {
        let cv = features::coefficient_of_variation(&values);
        prop_assert!(cv.is_some_and(|c| c >= 0.0));
    }
}

// ── 5. Max-amount vacuity ──

proptest! {
    #[test]
    fn max_amount_true_when_nothing_qualifies(tape in arb_tape(2, 40), lookback in 0usize..20) {
        let anchor = tape.len() - 1;
        prop_assert!(features::is_max_amount(&tape, anchor, f64::INFINITY, lookback));
    }
}

// ── 6. Retracement needs a prior rise ──

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn retracement_follows_a_rise(tape in arb_tape(20, 200)) {
        let mut config = permissive_config();
        config.exit.retracement.min_hold_ms = 0;
        config.exit.retracement.min_profit = 0.0;
        config.exit.retracement.inflection_window = 3;
        config.exit.max_hold_seconds = 60.0;
        for p in run(&tape, &config) {
            if p.exit_reason == ExitReason::RetracementStop {
                let peak = tape[p.entry_index..=p.exit_signal_index]
                    .iter()
                    .map(Tick::price)
                    .fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(peak > p.entry_price);
            }
        }
    }
}

// ── 7. Bucket totals ──

proptest! {
    #[test]
    fn bucket_counts_cover_every_record(rows in arb_records()) {
        let records = to_records(&rows);
        let mut agg = Aggregator::new(&x_config());
        for r in &records {
            agg.ingest(r);
        }
        let summary = agg.summarize();
        prop_assert_eq!(summary.total_records, records.len() as u64);

        let carrying = rows.iter().filter(|(_, v)| v.is_some()).count() as u64;
        let bucketed: u64 = summary
            .conditions
            .get("x")
            .map(|stats| stats.iter().map(|s| s.count).sum())
            .unwrap_or(0);
        prop_assert_eq!(bucketed, carrying);
    }
}

// ── 8. Merge is additive ──

proptest! {
    #[test]
    fn merge_matches_single_pass(rows in arb_records(), split in 0usize..60) {
        let records = to_records(&rows);
        let split = split.min(records.len());

        let mut whole = Aggregator::new(&x_config());
        records.iter().for_each(|r| whole.ingest(r));

        let mut left = Aggregator::new(&x_config());
        let mut right = Aggregator::new(&x_config());
        records[..split].iter().for_each(|r| left.ingest(r));
        records[split..].iter().for_each(|r| right.ingest(r));
        left.merge(&right);

        let a = whole.summarize();
        let b = left.summarize();
        prop_assert_eq!(a.total_records, b.total_records);
        prop_assert_eq!(a.win_count, b.win_count);
        prop_assert_eq!(a.trimmed_records, b.trimmed_records);
        prop_assert!((a.avg_profit_rate - b.avg_profit_rate).abs() < 1e-9);
        prop_assert_eq!(a.conditions.len(), b.conditions.len());
        for (name, stats) in &a.conditions {
            let other = &b.conditions[name];
            prop_assert_eq!(stats.len(), other.len());
            for (x, y) in stats.iter().zip(other) {
                prop_assert_eq!(x.count, y.count);
                prop_assert_eq!(x.win_count, y.win_count);
            }
        }
    }
}

#[test]
fn accepted_outcome_carries_snapshot() {
    let tape: Vec<Tick> = (0..5)
        .map(|i| Tick {
            index: i,
            time_ms: i as i64 * 1_000,
            price: 1.0,
            signed_amount: 1.0,
            market_cap: 150.0,
            trader_id: String::new(),
        })
        .collect();
    let config = permissive_config();
    match evaluate(&tape, 3, 0, &config.entry) {
        EntryOutcome::Accepted(snapshot) => {
            assert_eq!(snapshot.get("time_since_last_trade"), Some(1_000.0))
        }
        other => panic!("expected acceptance, got {other:?}"),
    }
}
