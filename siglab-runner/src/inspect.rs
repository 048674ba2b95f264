//! Signal and position inspection.
//!
//! Computes the momentum and z-score signals side by side with the positions
//! their rules produce, so a user can eyeball warmup, gaps and the first
//! trades before trusting a backtest.

use chrono::NaiveDate;
use serde::Serialize;

use siglab_core::components::{
    mean_reversion_zscore_signal, momentum_signal, sign_threshold_rule, zscore_entry_exit_rule,
};
use siglab_core::{Position, PositionTable, PriceTable, SignalTable};

use crate::config::StrategyConfig;
use crate::runner::RunError;

/// Parameters for the two inspected strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InspectParams {
    pub momentum_lookback: usize,
    pub momentum_threshold: f64,
    pub zscore_lookback: usize,
    pub entry_z: f64,
    pub exit_z: f64,
}

impl Default for InspectParams {
    fn default() -> Self {
        Self {
            momentum_lookback: 20,
            momentum_threshold: 0.0,
            zscore_lookback: 20,
            entry_z: 1.0,
            exit_z: 0.2,
        }
    }
}

impl InspectParams {
    fn strategies(&self) -> [StrategyConfig; 2] {
        [
            StrategyConfig::Momentum {
                lookback: self.momentum_lookback,
                threshold: self.momentum_threshold,
            },
            StrategyConfig::MeanReversion {
                lookback: self.zscore_lookback,
                entry_z: self.entry_z,
                exit_z: self.exit_z,
            },
        ]
    }
}

/// Signals and positions for momentum and mean reversion on the same prices.
#[derive(Debug, Clone)]
pub struct SignalSnapshot {
    pub momentum: SignalTable,
    pub momentum_positions: PositionTable,
    pub zscore: SignalTable,
    pub mean_reversion_positions: PositionTable,
}

/// Compute both signals and their positions.
pub fn inspect_signals(
    prices: &PriceTable,
    params: &InspectParams,
) -> Result<SignalSnapshot, RunError> {
    for strategy in params.strategies() {
        strategy.validate()?;
    }

    let momentum = momentum_signal(prices, params.momentum_lookback);
    let momentum_positions = sign_threshold_rule(&momentum, params.momentum_threshold);
    let zscore = mean_reversion_zscore_signal(prices, params.zscore_lookback);
    let mean_reversion_positions = zscore_entry_exit_rule(&zscore, params.entry_z, params.exit_z);

    Ok(SignalSnapshot {
        momentum,
        momentum_positions,
        zscore,
        mean_reversion_positions,
    })
}

/// How often one instrument is long, flat and short, and when it first trades.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionActivity {
    pub column: String,
    pub long: usize,
    pub flat: usize,
    pub short: usize,
    /// Earliest dates with a non-flat position, oldest first.
    pub first_active: Vec<NaiveDate>,
}

/// Per-column position counts plus up to `first_n` earliest non-flat dates.
pub fn position_activity(positions: &PositionTable, first_n: usize) -> Vec<PositionActivity> {
    positions
        .iter_columns()
        .map(|(name, col)| {
            let count = |p: Position| col.iter().filter(|&&x| x == p).count();
            let first_active = positions
                .index()
                .iter()
                .zip(col)
                .filter(|(_, p)| **p != Position::Flat)
                .map(|(d, _)| *d)
                .take(first_n)
                .collect();
            PositionActivity {
                column: name.to_string(),
                long: count(Position::Long),
                flat: count(Position::Flat),
                short: count(Position::Short),
                first_active,
            }
        })
        .collect()
}
