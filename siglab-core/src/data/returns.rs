//! Log returns from prices.

use tracing::debug;

use super::align::drop_empty_rows;
use crate::domain::{LogReturnTable, PriceTable};

/// r(t) = ln(p(t)) - ln(p(t-1)).
///
/// The first price row has no return and is dropped, as is any later row
/// where every instrument's return is undefined. A return touching a missing
/// or non-positive price is NaN.
pub fn compute_log_returns(prices: &PriceTable) -> LogReturnTable {
    if prices.n_rows() < 2 {
        return prices.slice_rows(0..0);
    }

    let diffs = prices.map_columns(|col| {
        let mut out = vec![f64::NAN; col.len()];
        for t in 1..col.len() {
            let r = col[t].ln() - col[t - 1].ln();
            if r.is_finite() {
                out[t] = r;
            }
        }
        out
    });

    let returns = drop_empty_rows(&diffs.slice_rows(1..diffs.n_rows()));
    debug!(
        price_rows = prices.n_rows(),
        return_rows = returns.n_rows(),
        "computed log returns"
    );
    returns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_prices, DEFAULT_EPSILON};

    #[test]
    fn drops_first_row() {
        let prices = make_prices(&[("SPY", [100.0, 110.0, 99.0])]);
        let rets = compute_log_returns(&prices);
        assert_eq!(rets.index(), &prices.index()[1..]);
        let col = rets.column("SPY").unwrap();
        assert_approx(col[0], (1.1_f64).ln(), DEFAULT_EPSILON);
        assert_approx(col[1], (0.9_f64).ln(), DEFAULT_EPSILON);
    }

    #[test]
    fn gap_is_undefined_not_zero() {
        let prices = make_prices(&[("A", [1.0, f64::NAN, 2.0, 4.0]), ("B", [1.0, 1.0, 1.0, 1.0])]);
        let rets = compute_log_returns(&prices);
        let a = rets.column("A").unwrap();
        assert!(a[0].is_nan());
        assert!(a[1].is_nan());
        assert_approx(a[2], 2.0_f64.ln(), DEFAULT_EPSILON);
    }

    #[test]
    fn all_undefined_rows_dropped() {
        let prices = make_prices(&[("A", [1.0, f64::NAN, 2.0, 4.0])]);
        let rets = compute_log_returns(&prices);
        // rows 1 and 2 touch the gap
        assert_eq!(rets.n_rows(), 1);
        assert_eq!(rets.index()[0], prices.index()[3]);
    }

    #[test]
    fn single_row_has_no_returns() {
        let prices = make_prices(&[("SPY", [100.0])]);
        let rets = compute_log_returns(&prices);
        assert!(rets.is_empty());
        assert_eq!(rets.columns(), prices.columns());
    }
}
