//! Momentum ratio — lookback return as a fraction.
//!
//! signal[t] = price[t] / price[t-lookback] - 1
//! Lookback: `lookback` rows.

use crate::domain::{PriceTable, SignalTable};
use tracing::debug;

use super::SignalGenerator;

#[derive(Debug, Clone)]
pub struct MomentumSignal {
    lookback: usize,
    name: String,
}

impl MomentumSignal {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 1, "momentum lookback must be >= 1");
        Self {
            lookback,
            name: format!("momentum_{lookback}"),
        }
    }

    pub fn default_params() -> Self {
        Self::new(20)
    }

    fn compute_column(&self, prices: &[f64]) -> Vec<Option<f64>> {
        let n = prices.len();
        let mut out = vec![None; n];
        for i in self.lookback..n {
            let ratio = prices[i] / prices[i - self.lookback] - 1.0;
            // NaN prices and a zero base price both land here
            if ratio.is_finite() {
                out[i] = Some(ratio);
            }
        }
        out
    }
}

impl SignalGenerator for MomentumSignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.lookback
    }

    fn compute(&self, prices: &PriceTable) -> SignalTable {
        debug!(
            signal = %self.name,
            rows = prices.n_rows(),
            instruments = prices.n_cols(),
            "computing momentum signal"
        );
        prices.map_columns(|col| self.compute_column(col))
    }
}
