//! Tick tape loading.
//!
//! Input is one JSON object keyed by asset id:
//!
//! ```json
//! { "asset": { "trade_data": [ { "price": 1.0, "tradeamount": -5.0,
//!   "tradetime": 1700000000000, "nowsol": 150.0, "user": "w1" } ] } }
//! ```
//!
//! Loading is lenient at the record level and strict at the top level:
//! 1. A top-level value that is not an object fails the whole load.
//! 2. An asset entry without a `trade_data` array is skipped and reported.
//! 3. Inside a record, missing or malformed numbers read as zero.
//! 4. A missing or malformed time repeats the previous tick's time (zero for
//!    the first record), so one bad field never reorders the tape.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use ticklab_core::domain::Tick;

/// Tapes keyed by asset id, ordered for deterministic output.
pub type AssetTapes = BTreeMap<String, Vec<Tick>>;

/// Errors from the loading layer. Only structural problems are errors.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read tape file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object keyed by asset id, found {found}")]
    NotAnObject { found: &'static str },
}

/// What happened during a load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded_assets: usize,
    pub total_ticks: usize,
    /// (asset id, reason) for every asset left out.
    pub skipped: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedTapes {
    pub tapes: AssetTapes,
    pub report: LoadReport,
}

const PRICE_KEYS: &[&str] = &["price"];
const AMOUNT_KEYS: &[&str] = &["tradeamount", "signed_amount"];
const TIME_KEYS: &[&str] = &["tradetime", "time_ms"];
const MARKET_CAP_KEYS: &[&str] = &["nowsol", "market_cap"];
const TRADER_KEYS: &[&str] = &["user", "trader_id"];

/// Read and parse a tape file.
pub fn load_tapes(path: impl AsRef<Path>) -> Result<LoadedTapes, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let loaded = parse_tapes(&text)?;
    info!(
        path = %path.display(),
        assets = loaded.report.loaded_assets,
        ticks = loaded.report.total_ticks,
        skipped = loaded.report.skipped.len(),
        "loaded tapes"
    );
    Ok(loaded)
}

pub fn parse_tapes(text: &str) -> Result<LoadedTapes, LoadError> {
    let value: Value = serde_json::from_str(text)?;
    tapes_from_value(&value)
}

pub fn tapes_from_value(value: &Value) -> Result<LoadedTapes, LoadError> {
    let Value::Object(assets) = value else {
        return Err(LoadError::NotAnObject {
            found: kind_of(value),
        });
    };

    let mut loaded = LoadedTapes::default();
    for (asset, entry) in assets {
        let Some(records) = entry.get("trade_data").and_then(Value::as_array) else {
            warn!(asset = %asset, "skipping asset without a trade_data array");
            loaded
                .report
                .skipped
                .push((asset.clone(), "missing trade_data array".to_string()));
            continue;
        };
        let mut tape: Vec<Tick> = Vec::with_capacity(records.len());
        let mut carried = 0usize;
        for (i, record) in records.iter().enumerate() {
            let previous_ms = tape.last().map_or(0, |t| t.time_ms);
            let (tick, time_ok) = parse_record(i, record, previous_ms);
            if !time_ok {
                carried += 1;
            }
            tape.push(tick);
        }
        if carried > 0 {
            warn!(
                asset = %asset,
                records = carried,
                "missing or malformed trade times carried forward"
            );
        }
        loaded.report.loaded_assets += 1;
        loaded.report.total_ticks += tape.len();
        loaded.tapes.insert(asset.clone(), tape);
    }
    Ok(loaded)
}

/// Encode tapes back into the input format.
pub fn tapes_to_value(tapes: &AssetTapes) -> Value {
    let assets: Map<String, Value> = tapes
        .iter()
        .map(|(asset, tape)| {
            let records: Vec<Value> = tape
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "price": t.price,
                        "tradeamount": t.signed_amount,
                        "tradetime": t.time_ms,
                        "nowsol": t.market_cap,
                        "user": t.trader_id,
                    })
                })
                .collect();
            (asset.clone(), serde_json::json!({ "trade_data": records }))
        })
        .collect();
    Value::Object(assets)
}

/// Parse one record. The flag is false when the time fell back to `previous_ms`.
fn parse_record(index: usize, record: &Value, previous_ms: i64) -> (Tick, bool) {
    let empty = Map::new();
    let fields = record.as_object().unwrap_or(&empty);
    let time_ms = integer(fields, TIME_KEYS);
    let tick = Tick {
        index: index as u32,
        time_ms: time_ms.unwrap_or(previous_ms),
        price: number(fields, PRICE_KEYS),
        signed_amount: number(fields, AMOUNT_KEYS),
        market_cap: number(fields, MARKET_CAP_KEYS),
        trader_id: text(fields, TRADER_KEYS),
    };
    (tick, time_ms.is_some())
}

/// First present key wins. Numbers and numeric strings are accepted; anything
/// else, including non-finite values, reads as zero.
fn number(fields: &Map<String, Value>, keys: &[&str]) -> f64 {
    let raw = keys.iter().find_map(|k| fields.get(*k));
    let value = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Integer milliseconds, truncating fractions. `None` when absent or unparsable.
fn integer(fields: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    let raw = keys.iter().find_map(|k| fields.get(*k))?;
    let exact = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => return None,
    };
    exact.or_else(|| {
        let float = match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        float.filter(|v| v.is_finite()).map(|v| v as i64)
    })
}

fn text(fields: &Map<String, Value>, keys: &[&str]) -> String {
    match keys.iter().find_map(|k| fields.get(*k)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
