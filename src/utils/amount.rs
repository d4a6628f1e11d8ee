//! Base-unit / UI-amount conversions
//!
//! Balances live in integer base units; quote fields are UI amounts (f64). Comparisons
//! between the two are done after rounding to the token's decimal precision.

#[inline]
fn scale(decimals: u8) -> f64 {
    10f64.powi(decimals as i32)
}

/// Base units → UI amount
#[inline]
pub fn lamports_to_amount(lamports: u64, decimals: u8) -> f64 {
    lamports as f64 / scale(decimals)
}

/// UI amount → base units, rounded to nearest. Negative and non-finite input yields 0.
pub fn amount_to_lamports(amount: f64, decimals: u8) -> u64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    let lamports = (amount * scale(decimals)).round();
    if lamports >= u64::MAX as f64 { u64::MAX } else { lamports as u64 }
}

/// Round half away from zero at `decimals` fractional digits
pub fn round_to_decimals(value: f64, decimals: u8) -> f64 {
    let factor = scale(decimals);
    (value * factor).round() / factor
}

/// Truncate toward negative infinity at `decimals` fractional digits
pub fn floor_to_decimals(value: f64, decimals: u8) -> f64 {
    let factor = scale(decimals);
    (value * factor).floor() / factor
}

/// `lhs > rhs` at the given precision. A missing `rhs` never compares smaller.
pub fn is_greater_than(lhs: f64, rhs: Option<f64>, decimals: u8) -> bool {
    match rhs {
        Some(rhs) => round_to_decimals(lhs, decimals) > round_to_decimals(rhs, decimals),
        None => false,
    }
}
