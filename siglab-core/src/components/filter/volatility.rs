//! Volatility regime gate — suppresses exposure when realized volatility is high.
//!
//! gate[t] = rolling_std(log_returns, vol_lookback)[t] <= vol_threshold
//!
//! The rolling deviation uses the sample (N-1) estimator. Rows without a full
//! window have no volatility reading and therefore gate off.

use crate::domain::{GateTable, LogReturnTable, PositionTable};
use crate::indicators::rolling_std;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityGate {
    pub vol_lookback: usize,
    pub vol_threshold: f64,
}

impl VolatilityGate {
    pub fn new(vol_lookback: usize, vol_threshold: f64) -> Self {
        assert!(vol_lookback >= 1, "vol_lookback must be >= 1");
        Self {
            vol_lookback,
            vol_threshold,
        }
    }

    /// 20-period window, 2% per-period volatility ceiling.
    pub fn default_params() -> Self {
        Self::new(20, 0.02)
    }

    pub fn compute(&self, log_returns: &LogReturnTable) -> GateTable {
        debug!(
            vol_lookback = self.vol_lookback,
            vol_threshold = self.vol_threshold,
            rows = log_returns.n_rows(),
            "computing volatility gate"
        );
        log_returns.map_columns(|col| {
            rolling_std(col, self.vol_lookback, 1)
                .into_iter()
                .map(|vol| matches!(vol, Some(v) if v <= self.vol_threshold))
                .collect()
        })
    }
}

/// Trade/no-trade mask from rolling volatility of log returns.
pub fn vol_regime_filter(
    log_returns: &LogReturnTable,
    vol_lookback: usize,
    vol_threshold: f64,
) -> GateTable {
    VolatilityGate::new(vol_lookback, vol_threshold).compute(log_returns)
}

/// Multiply positions by the gate, cell by cell.
///
/// The result keeps the positions' index and columns. A position cell with
/// no matching gate cell counts as gate 0 and goes flat.
pub fn apply_gate(positions: &PositionTable, gate: &GateTable) -> PositionTable {
    let aligned = gate.reindex(positions.index(), positions.columns(), false);
    positions.zip_map(&aligned, |p, &open| p.gated(open))
}

/// Share of rows with the gate open, per column. NaN for an empty gate.
pub fn gate_fraction(gate: &GateTable) -> Vec<(String, f64)> {
    gate.iter_columns()
        .map(|(name, col)| {
            let open = col.iter().filter(|&&g| g).count();
            let frac = if col.is_empty() {
                f64::NAN
            } else {
                open as f64 / col.len() as f64
            };
            (name.to_string(), frac)
        })
        .collect()
}
