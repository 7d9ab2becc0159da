//! Synthetic tick tapes for development, benchmarks, and tests.
//!
//! Each asset gets a deterministic stream seeded from the batch seed and the
//! asset id, so one asset's tape does not change when others are added.
//!
//! The model is deliberately simple:
//! 1. Every trade moves the market cap by its signed SOL amount.
//! 2. Price tracks market cap through a fixed supply.
//! 3. Gaps between trades are uniform around a mean, with occasional lulls.
//! 4. A small share of trades are large sells, which is what entry rules look for.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use ticklab_core::domain::Tick;

use crate::data_loader::AssetTapes;

const SUPPLY: f64 = 1.0e9;
const MIN_MARKET_CAP: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub ticks_per_asset: usize,
    pub start_time_ms: i64,
    pub start_market_cap: f64,
    pub mean_gap_ms: i64,
    /// Chance that a gap is a lull of 50x the mean.
    pub lull_probability: f64,
    pub sell_probability: f64,
    pub max_trade_sol: f64,
    /// Chance that a sell is large (5 to 20x `max_trade_sol`).
    pub large_sell_probability: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            ticks_per_asset: 2_000,
            start_time_ms: 1_700_000_000_000,
            start_market_cap: 120.0,
            mean_gap_ms: 800,
            lull_probability: 0.01,
            sell_probability: 0.35,
            max_trade_sol: 1.5,
            large_sell_probability: 0.02,
            seed: 42,
        }
    }
}

/// One tape for `asset`.
pub fn generate_tape(asset: &str, config: &SyntheticConfig) -> Vec<Tick> {
    let mut rng = rng_for(asset, config.seed);
    let mut tape = Vec::with_capacity(config.ticks_per_asset);
    let mut time_ms = config.start_time_ms;
    let mut market_cap = config.start_market_cap.max(MIN_MARKET_CAP);
    let max_trade = config.max_trade_sol.max(0.01);
    let mean_gap = config.mean_gap_ms.max(1);

    for i in 0..config.ticks_per_asset {
        // Creation tick is always a buy.
        let is_sell = i > 0 && rng.gen_bool(config.sell_probability.clamp(0.0, 1.0));
        let size = if is_sell && rng.gen_bool(config.large_sell_probability.clamp(0.0, 1.0)) {
            max_trade * rng.gen_range(5.0..20.0)
        } else {
            max_trade * rng.gen::<f64>().powi(2) + 0.001
        };
        let signed_amount = if is_sell {
            -size.min(market_cap - MIN_MARKET_CAP).max(0.001)
        } else {
            size
        };

        if i > 0 {
            let gap = rng.gen_range(1..=2 * mean_gap);
            time_ms += if rng.gen_bool(config.lull_probability.clamp(0.0, 1.0)) {
                gap * 50
            } else {
                gap
            };
        }
        market_cap = (market_cap + signed_amount).max(MIN_MARKET_CAP);

        tape.push(Tick {
            index: i as u32,
            time_ms,
            price: market_cap / SUPPLY,
            signed_amount,
            market_cap,
            trader_id: format!("w{}", rng.gen_range(0..500)),
        });
    }
    tape
}

/// `assets` tapes named `asset_000`, `asset_001`, ...
pub fn generate_tapes(assets: usize, config: &SyntheticConfig) -> AssetTapes {
    (0..assets)
        .map(|i| {
            let id = format!("asset_{i:03}");
            let tape = generate_tape(&id, config);
            (id, tape)
        })
        .collect()
}

fn rng_for(asset: &str, seed: u64) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(asset.as_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}
