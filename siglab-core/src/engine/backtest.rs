//! Lagged, equal-weight, turnover-costed backtest.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{LogReturnTable, PositionTable};
use crate::frame::{FrameError, Series};

use super::alignment::{align_positions, AlignmentPolicy};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error(
        "positions do not match returns: {missing_dates} return dates without a position, \
         missing instruments {missing_columns:?}, unknown instruments {extra_columns:?}"
    )]
    Misaligned {
        missing_dates: usize,
        missing_columns: Vec<String>,
        extra_columns: Vec<String>,
    },

    #[error("transaction cost must be >= 0 bps, got {0}")]
    InvalidCost(f64),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Cost per unit of turnover, in basis points. Zero disables costs.
    pub transaction_cost_bps: f64,
    pub alignment: AlignmentPolicy,
}

impl BacktestConfig {
    pub fn with_cost_bps(transaction_cost_bps: f64) -> Self {
        Self {
            transaction_cost_bps,
            ..Self::default()
        }
    }
}

/// Output of one backtest. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    positions: PositionTable,
    strategy_log_returns: Series,
    equity_curve: Series,
}

impl BacktestResult {
    /// Target positions aligned onto the returns (before the lag).
    pub fn positions(&self) -> &PositionTable {
        &self.positions
    }

    pub fn strategy_log_returns(&self) -> &Series {
        &self.strategy_log_returns
    }

    pub fn equity_curve(&self) -> &Series {
        &self.equity_curve
    }

    /// Last equity value; NaN when the curve is empty.
    pub fn final_equity(&self) -> f64 {
        self.equity_curve.last().unwrap_or(f64::NAN)
    }
}

/// Sum of absolute position changes per row. The first row has no prior
/// row and counts as zero turnover.
pub fn turnover(positions: &PositionTable) -> Vec<f64> {
    let mut out = vec![0.0; positions.n_rows()];
    for (_, col) in positions.iter_columns() {
        for t in 1..col.len() {
            out[t] += col[t].change_from(col[t - 1]);
        }
    }
    out
}

/// Simulate an equal-weight portfolio that holds yesterday's target today.
///
/// strategy(t) = Σ_i position(t-1, i) / N · r(t, i) − bps/10⁴ · turnover(t)
///
/// Undefined asset returns contribute nothing to the sum.
pub fn backtest_positions(
    asset_log_returns: &LogReturnTable,
    positions: &PositionTable,
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    let cost_bps = config.transaction_cost_bps;
    if !(cost_bps >= 0.0) {
        return Err(BacktestError::InvalidCost(cost_bps));
    }

    let aligned = align_positions(asset_log_returns, positions, config.alignment)?;
    let n_rows = asset_log_returns.n_rows();
    let n = asset_log_returns.n_cols().max(1) as f64;

    debug!(
        rows = n_rows,
        instruments = asset_log_returns.n_cols(),
        cost_bps,
        "running backtest"
    );

    let mut strategy = vec![0.0; n_rows];
    for (j, (_, returns)) in asset_log_returns.iter_columns().enumerate() {
        let held = aligned.column_at(j);
        for t in 1..n_rows {
            let r = returns[t];
            if r.is_nan() {
                continue;
            }
            strategy[t] += held[t - 1].as_f64() / n * r;
        }
    }

    if cost_bps > 0.0 {
        let rate = cost_bps / 10_000.0;
        for (s, to) in strategy.iter_mut().zip(turnover(&aligned)) {
            *s -= rate * to;
        }
    }

    let mut cumulative = 0.0;
    let mut equity: Vec<f64> = strategy
        .iter()
        .map(|s| {
            cumulative += s;
            cumulative.exp()
        })
        .collect();
    if let Some(first) = equity.first_mut() {
        *first = 1.0;
    }

    let index = asset_log_returns.index().to_vec();
    Ok(BacktestResult {
        positions: aligned,
        strategy_log_returns: Series::new(index.clone(), strategy)?,
        equity_curve: Series::new(index, equity)?,
    })
}
