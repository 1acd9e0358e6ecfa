/// Fixed-point precision of per-pledge accumulators
pub const PRECISION: i128 = 1_000_000_000_000_000_000; // 1e18

/// 100% = 10,000 basis points
pub const BASIS_POINTS: i128 = 10_000;

pub const SECONDS_PER_YEAR: i128 = 365 * 24 * 60 * 60;

/// `a * b / c`, rounded down. `None` on overflow or a zero divisor.
pub fn mul_div(a: i128, b: i128, c: i128) -> Option<i128> {
    if c == 0 {
        return None;
    }
    a.checked_mul(b)?.checked_div(c)
}

/// Amount owed to (or by) a position since its snapshot
///
/// Formula: (accumulator - snapshot) × pledge / PRECISION
///
/// Example:
/// - 50,000 loss spread over 100,000 pledged → accumulator 0.5e18
/// - pledge 10,000 with snapshot 0 → 5,000
pub fn accrued(accumulator: i128, snapshot: i128, pledge: i128) -> Option<i128> {
    let delta = accumulator.checked_sub(snapshot)?;
    if delta <= 0 || pledge <= 0 {
        return Some(0);
    }
    mul_div(delta, pledge, PRECISION)
}

/// Accumulator increment for `amount` spread over `total_pledge`
pub fn per_pledge(amount: i128, total_pledge: i128) -> Option<i128> {
    mul_div(amount, PRECISION, total_pledge)
}
