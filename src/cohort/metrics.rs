/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn fixed(value: f64, places: usize) -> String {
    format!("{value:.places$}")
}

/// `current - previous` as a signed count, pinned to the `i64` range.
pub fn count_diff(current: u64, previous: u64) -> i64 {
    let diff = i128::from(current) - i128::from(previous);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}

/// Percent change from `previous` to a value `diff` above it; 0 when there is
/// no base to grow from.
pub fn growth_pct(diff: i64, previous: u64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    round_to(diff as f64 / previous as f64 * 100.0, 2)
}

pub fn conversion_pct(purchases: u64, visitors: u64) -> String {
    if visitors == 0 {
        return "0.00".to_string();
    }
    fixed(purchases as f64 / visitors as f64 * 100.0, 2)
}

/// Purchases per calendar day.
pub fn velocity(purchases: u64, days_in_month: u32) -> String {
    if days_in_month == 0 {
        return "0.0".to_string();
    }
    fixed(purchases as f64 / f64::from(days_in_month), 1)
}
