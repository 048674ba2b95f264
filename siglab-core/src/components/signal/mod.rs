//! Signal generators: price table in, real-valued indicator table out.
//!
//! Generators are pure. Rows inside a generator's lookback window, and rows
//! whose inputs are missing, are `None` ("no signal") rather than a number.

pub mod momentum;
pub mod zscore;

pub use momentum::MomentumSignal;
pub use zscore::ZScoreSignal;

use crate::domain::{PriceTable, SignalTable};

/// Computes an indicator per instrument from a price table.
///
/// Implementations never look at data after row `t` when producing row `t`.
pub trait SignalGenerator: Send + Sync {
    /// Short identifier, e.g. `momentum_20`.
    fn name(&self) -> &str;

    /// Rows at the start of each column that cannot carry a signal.
    fn lookback(&self) -> usize;

    fn compute(&self, prices: &PriceTable) -> SignalTable;
}

/// signal(t) = price(t) / price(t - lookback) - 1.
pub fn momentum_signal(prices: &PriceTable, lookback: usize) -> SignalTable {
    MomentumSignal::new(lookback).compute(prices)
}

/// z(t) = (price(t) - rolling mean) / rolling population std.
pub fn mean_reversion_zscore_signal(prices: &PriceTable, lookback: usize) -> SignalTable {
    ZScoreSignal::new(lookback).compute(prices)
}
