//! Strategy components: signal generators, position rules, and regime filters.
//!
//! A strategy is a signal composed with a rule, optionally gated:
//! prices → `SignalGenerator` → `PositionRule` → (`apply_gate`) → positions.

pub mod filter;
pub mod rule;
pub mod signal;

pub use filter::{apply_gate, gate_fraction, vol_regime_filter, VolatilityGate};
pub use rule::{
    sign_threshold_rule, zscore_entry_exit_rule, HysteresisState, PositionRule, SignThreshold,
    ZScoreEntryExit,
};
pub use signal::{
    mean_reversion_zscore_signal, momentum_signal, MomentumSignal, SignalGenerator, ZScoreSignal,
};

use crate::domain::{PositionTable, PriceTable};

/// Time-series momentum: long above `threshold`, short below `-threshold`.
pub fn momentum(prices: &PriceTable, lookback: usize, threshold: f64) -> PositionTable {
    let signal = MomentumSignal::new(lookback).compute(prices);
    SignThreshold::new(threshold).apply(&signal)
}

/// Mean reversion on the rolling z-score with an entry/exit band.
pub fn mean_reversion_zscore(
    prices: &PriceTable,
    lookback: usize,
    entry_z: f64,
    exit_z: f64,
) -> PositionTable {
    let z = ZScoreSignal::new(lookback).compute(prices);
    ZScoreEntryExit::new(entry_z, exit_z).apply(&z)
}
