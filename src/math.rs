//! Checked fixed-point helpers for share and debt accounting.
//!
//! Every helper returns `None` on overflow or division by zero so callers can
//! revert instead of silently saturating shared accounting.

use odra::casper_types::U256;

/// Basis points divisor (100% = 10_000 bps)
pub const BPS_DIVISOR: u64 = 10_000;
/// 1 wad = 1e18
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// `a * b / denominator`, rounded down.
pub fn mul_div_down(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    a.checked_mul(b).map(|x| x / denominator)
}

/// `a * b / denominator`, rounded up.
pub fn mul_div_up(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    let product = a.checked_mul(b)?;
    let quotient = product / denominator;
    if (product % denominator).is_zero() {
        Some(quotient)
    } else {
        quotient.checked_add(U256::one())
    }
}

/// `amount * bps / 10_000`, rounded down.
pub fn bps_of(amount: U256, bps: u64) -> Option<U256> {
    mul_div_down(amount, U256::from(bps), U256::from(BPS_DIVISOR))
}
