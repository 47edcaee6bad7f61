//! Triple-slope interest rate model.
//!
//! Maps pool utilization to a per-second borrow rate scaled by 1e18:
//! - 0% to 60% utilization: 0% to 20% APR, linear
//! - 60% to 90% utilization: flat 20% APR
//! - 90% to 100% utilization: 20% to 150% APR, linear
//!
//! Utilization above 100% is treated as 100%.

use odra::casper_types::U256;

use crate::math::{mul_div_down, WAD};

/// Seconds per year (365 days)
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// End of the first slope: 60% utilization (wad)
const CEIL_SLOPE_1: u128 = 600_000_000_000_000_000;
/// End of the plateau: 90% utilization (wad)
const CEIL_SLOPE_2: u128 = 900_000_000_000_000_000;
/// Plateau rate: 20% APR (wad)
const PLATEAU_RATE: u128 = 200_000_000_000_000_000;
/// Third slope multiplier: 130% APR over 10% utilization
const SLOPE_3_MULTIPLIER: u64 = 13;
/// 1 bps of utilization in wad
const WAD_PER_BPS: u128 = 100_000_000_000_000;

/// Utilization of the pool, 1e18-scaled and clamped to 100%.
///
/// Returns zero for an empty pool; `None` only if `debt * 1e18` overflows.
pub fn utilization(debt: U256, total_token: U256) -> Option<U256> {
    if total_token.is_zero() {
        return Some(U256::zero());
    }
    let utilization = mul_div_down(debt, U256::from(WAD), total_token)?;
    Some(utilization.min(U256::from(WAD)))
}

/// Annualized borrow rate for a 1e18-scaled utilization.
pub fn annual_rate(utilization: U256) -> U256 {
    let utilization = utilization.min(U256::from(WAD));
    if utilization <= U256::from(CEIL_SLOPE_1) {
        // 20% / 60% = 1/3 per point of utilization
        utilization / U256::from(3u64)
    } else if utilization <= U256::from(CEIL_SLOPE_2) {
        U256::from(PLATEAU_RATE)
    } else {
        let excess = utilization - U256::from(CEIL_SLOPE_2);
        U256::from(PLATEAU_RATE) + excess * U256::from(SLOPE_3_MULTIPLIER)
    }
}

/// Per-second borrow rate (1e18-scaled) for a 1e18-scaled utilization.
pub fn rate_per_second(utilization: U256) -> U256 {
    annual_rate(utilization) / U256::from(SECONDS_PER_YEAR)
}

/// Per-second borrow rate for a utilization given in basis points.
pub fn rate_for_bps(utilization_bps: u64) -> U256 {
    rate_per_second(U256::from(utilization_bps) * U256::from(WAD_PER_BPS))
}

/// Per-second rate for a pool with `debt` outstanding out of `total_token`.
pub fn rate_for_pool(debt: U256, total_token: U256) -> Option<U256> {
    utilization(debt, total_token).map(rate_per_second)
}

/// Interest owed on `debt` at `rate` (per second, 1e18-scaled) over `elapsed` seconds.
pub fn pending_interest(debt: U256, rate: U256, elapsed: u64) -> Option<U256> {
    debt.checked_mul(rate)
        .and_then(|x| x.checked_mul(U256::from(elapsed)))
        .map(|x| x / U256::from(WAD))
}
