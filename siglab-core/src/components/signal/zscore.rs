//! Mean-reversion z-score.
//!
//! z[t] = (price[t] - mean(price[t-L+1..=t])) / std(price[t-L+1..=t])
//! using the population standard deviation. Lookback: L - 1.

use crate::domain::{PriceTable, SignalTable};
use crate::indicators::{rolling_mean, rolling_std};
use tracing::debug;

use super::SignalGenerator;

#[derive(Debug, Clone)]
pub struct ZScoreSignal {
    window: usize,
    name: String,
}

impl ZScoreSignal {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "z-score window must be >= 1");
        Self {
            window,
            name: format!("zscore_{window}"),
        }
    }

    pub fn default_params() -> Self {
        Self::new(20)
    }

    fn compute_column(&self, prices: &[f64]) -> Vec<Option<f64>> {
        let means = rolling_mean(prices, self.window);
        let stds = rolling_std(prices, self.window, 0);

        prices
            .iter()
            .zip(means.into_iter().zip(stds))
            .map(|(&p, stats)| match stats {
                (Some(mean), Some(sd)) if sd > 0.0 => Some((p - mean) / sd),
                _ => None,
            })
            .collect()
    }
}

impl SignalGenerator for ZScoreSignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, prices: &PriceTable) -> SignalTable {
        debug!(
            signal = %self.name,
            rows = prices.n_rows(),
            instruments = prices.n_cols(),
            "computing z-score signal"
        );
        prices.map_columns(|col| self.compute_column(col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_prices, DEFAULT_EPSILON};

    #[test]
    fn zscore_basic() {
        let prices = make_prices(&[("SPY", [1.0, 2.0, 3.0, 5.0])]);
        let z = ZScoreSignal::new(3).compute(&prices);
        let col = z.column("SPY").unwrap();

        assert_eq!(col[0], None);
        assert_eq!(col[1], None);
        // window [1,2,3]: mean 2, pop std sqrt(2/3)
        assert_approx(col[2].unwrap(), 1.0 / (2.0_f64 / 3.0).sqrt(), DEFAULT_EPSILON);
        // window [2,3,5]: mean 10/3, pop std sqrt(14/9)
        let expected = (5.0 - 10.0 / 3.0) / (14.0_f64 / 9.0).sqrt();
        assert_approx(col[3].unwrap(), expected, DEFAULT_EPSILON);
    }

    #[test]
    fn flat_window_has_no_signal() {
        let prices = make_prices(&[("SPY", [10.0, 10.0, 10.0, 11.0])]);
        let col = ZScoreSignal::new(3).compute(&prices).column("SPY").unwrap().to_vec();
        assert_eq!(col[2], None);
        assert!(col[3].is_some());
    }

    #[test]
    fn gap_in_window_has_no_signal() {
        let prices = make_prices(&[("SPY", [1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0])]);
        let col = ZScoreSignal::new(2).compute(&prices).column("SPY").unwrap().to_vec();
        assert!(col[1].is_some());
        assert_eq!(col[2], None);
        assert_eq!(col[3], None);
        assert!(col[4].is_some());
    }

    #[test]
    fn lookback_is_window_minus_one() {
        assert_eq!(ZScoreSignal::new(20).lookback(), 19);
        assert_eq!(ZScoreSignal::default_params().name(), "zscore_20");
    }
}
