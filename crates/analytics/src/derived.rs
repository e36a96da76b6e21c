//! Derived metrics
//!
//! Ratios are computed from raw counts after decoding, never in SQL.

/// `n / d`, with a zero denominator treated as one
pub fn relative(n: u64, d: u64) -> f64 {
    n as f64 / d.max(1) as f64
}

/// Relative change from `previous` to `current`
///
/// Zero when both are zero, one when only the previous value is zero.
pub fn growth(current: f64, previous: f64) -> f64 {
    if current == 0.0 && previous == 0.0 {
        0.0
    } else if previous == 0.0 {
        1.0
    } else {
        (current - previous) / previous
    }
}

/// [`growth`] over counts
pub fn growth_u64(current: u64, previous: u64) -> f64 {
    growth(current as f64, previous as f64)
}
