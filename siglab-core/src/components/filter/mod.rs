//! Regime filters — masks multiplied into positions to suppress exposure.

pub mod volatility;

pub use volatility::{apply_gate, gate_fraction, vol_regime_filter, VolatilityGate};
