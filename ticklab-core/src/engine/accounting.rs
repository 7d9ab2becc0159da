//! Position sizing, fees, and realized P&L for one round trip.

use super::state::ExecutionConfig;

/// Realized result of one round trip, in SOL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    pub size_sol: f64,
    pub entry_fee: f64,
    pub exit_fee: f64,
    pub proceeds_sol: f64,
    pub profit_sol: f64,
    pub profit_rate: f64,
}

/// Position size for a fill at the given market cap.
pub fn position_size(market_cap: f64, config: &ExecutionConfig) -> f64 {
    let scaled = config.size_coefficient * market_cap.max(0.0).sqrt() + config.size_intercept;
    scaled.max(config.min_size_sol)
}

/// Fee charged on one leg of `amount_sol`.
pub fn fee(amount_sol: f64, config: &ExecutionConfig) -> f64 {
    amount_sol * config.fee_rate + config.fee_fixed_sol
}

/// Settle a round trip. `entry_price` must be positive.
pub fn settle(
    size_sol: f64,
    entry_price: f64,
    exit_price: f64,
    config: &ExecutionConfig,
) -> Settlement {
    let entry_fee = fee(size_sol, config);
    let tokens = (size_sol - entry_fee) / entry_price;
    let gross = tokens * exit_price;
    let exit_fee = fee(gross, config);
    let proceeds_sol = gross - exit_fee;
    let profit_sol = proceeds_sol - size_sol;
    let profit_rate = if size_sol > 0.0 {
        profit_sol / size_sol
    } else {
        0.0
    };
    Settlement {
        size_sol,
        entry_fee,
        exit_fee,
        proceeds_sol,
        profit_sol,
        profit_rate,
    }
}
