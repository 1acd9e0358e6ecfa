use capital_interfaces::math::{mul_div, BASIS_POINTS, SECONDS_PER_YEAR};
use capital_interfaces::RateCurve;

/// Share of pool capital covered by sold policies
///
/// Formula: utilization = coverage_sold × 10,000 / capital_pledged
///
/// A pool with no capital counts as fully utilized.
pub fn utilization_bps(coverage_sold: i128, capital_pledged: i128) -> Option<i128> {
    if capital_pledged <= 0 {
        return Some(BASIS_POINTS);
    }
    mul_div(coverage_sold, BASIS_POINTS, capital_pledged)
}

/// Annual premium rate on the kinked curve
///
/// Below the kink:  base + slope1 × u
/// Above the kink:  base + slope1 × kink + slope2 × (u - kink)
///
/// Example:
/// - base 2%, slope1 10%, slope2 50%, kink 80%
/// - u = 50% → 2% + 5% = 7%
/// - u = 90% → 2% + 8% + 5% = 15%
pub fn annual_rate_bps(curve: &RateCurve, utilization: i128) -> Option<i128> {
    if utilization < curve.kink_bps {
        let variable = mul_div(curve.slope1_bps, utilization, BASIS_POINTS)?;
        return curve.base_rate_bps.checked_add(variable);
    }
    let to_kink = mul_div(curve.slope1_bps, curve.kink_bps, BASIS_POINTS)?;
    let past_kink = mul_div(
        curve.slope2_bps,
        utilization.checked_sub(curve.kink_bps)?,
        BASIS_POINTS,
    )?;
    curve.base_rate_bps.checked_add(to_kink)?.checked_add(past_kink)
}

/// Premium accrued on `coverage` over `elapsed` seconds
///
/// Formula: coverage × rate × elapsed / (SECONDS_PER_YEAR × 10,000)
pub fn premium_for(coverage: i128, rate_bps: i128, elapsed: u64) -> Option<i128> {
    coverage
        .checked_mul(rate_bps)?
        .checked_mul(elapsed as i128)?
        .checked_div(SECONDS_PER_YEAR.checked_mul(BASIS_POINTS)?)
}

/// Split a claim into (net payout, fee)
pub fn claim_split(coverage: i128, fee_bps: i128) -> Option<(i128, i128)> {
    let fee = mul_div(coverage, fee_bps, BASIS_POINTS)?;
    Some((coverage.checked_sub(fee)?, fee))
}

/// Distressed-asset units per unit of underlying
///
/// Formula: 10^(protocol_decimals - underlying_decimals), at least 1
pub fn decimal_scale(protocol_decimals: u32, underlying_decimals: u32) -> Option<i128> {
    if protocol_decimals <= underlying_decimals {
        return Some(1);
    }
    10i128.checked_pow(protocol_decimals - underlying_decimals)
}

/// Curves must have non-negative terms and a kink within (0, 100%]
pub fn is_valid_curve(curve: &RateCurve) -> bool {
    curve.base_rate_bps >= 0
        && curve.slope1_bps >= 0
        && curve.slope2_bps >= 0
        && curve.kink_bps > 0
        && curve.kink_bps <= BASIS_POINTS
}
