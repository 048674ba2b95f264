//! Rolling-window statistics shared by the signal generators and the volatility gate.
//!
//! A window yields a value only once it is full and contains no undefined (NaN)
//! observation, so early rows and rows next to data gaps read as `None`.

pub mod rolling;

pub use rolling::{rolling_mean, rolling_std};

/// Build a price table from `(column, values)` pairs on consecutive days from 2024-01-02.
#[cfg(test)]
pub fn make_prices<const N: usize>(columns: &[(&str, [f64; N])]) -> crate::domain::PriceTable {
    let n = if columns.is_empty() { 0 } else { N };
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let index = (0..n)
        .map(|i| base + chrono::Duration::days(i as i64))
        .collect();
    crate::frame::Frame::new(
        index,
        columns.iter().map(|(name, _)| name.to_string()).collect(),
        columns.iter().map(|(_, v)| v.to_vec()).collect(),
    )
    .unwrap()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
