use capital_interfaces::math::mul_div;

/// Shares minted for `value` at the current NAV
///
/// Formula: shares = value × total_shares / total_value (rounded down)
///
/// The first deposit mints at parity. Returns `None` when shares exist but
/// the system holds no value.
///
/// Example:
/// - total_value: 1,100, total_shares: 1,000
/// - value: 550 → 500 shares
pub fn value_to_shares(value: i128, total_value: i128, total_shares: i128) -> Option<i128> {
    if total_shares == 0 {
        return Some(value);
    }
    if total_value <= 0 {
        return None;
    }
    mul_div(value, total_shares, total_value)
}

/// Value redeemable for `shares` at the current NAV
///
/// Formula: value = shares × total_value / total_shares (rounded down)
pub fn shares_to_value(shares: i128, total_value: i128, total_shares: i128) -> Option<i128> {
    if total_shares == 0 {
        return Some(shares);
    }
    mul_div(shares, total_value, total_shares)
}

/// Portion of `target` owed by everything up to `cumulative_weight`
///
/// Differences between consecutive calls give per-adapter amounts that sum
/// to exactly `target` once `cumulative_weight == total_weight`.
pub fn cumulative_share(target: i128, cumulative_weight: i128, total_weight: i128) -> Option<i128> {
    mul_div(target, cumulative_weight, total_weight)
}
