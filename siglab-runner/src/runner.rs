//! Strategy runner — wires together components, engine, and metrics.
//!
//! Two entry points:
//! - `run_experiment()`: resolves data for a config, then runs. Used by the CLI.
//! - `run_strategy()`: takes pre-loaded data. Used by sweeps and rolling windows.
//!
//! `compare_strategies()` runs several configs over the same data for a
//! side-by-side table.

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use siglab_core::components::{
    apply_gate, gate_fraction, MomentumSignal, PositionRule, SignThreshold, SignalGenerator,
    VolatilityGate, ZScoreEntryExit, ZScoreSignal,
};
use siglab_core::data::{CsvCache, PriceProvider};
use siglab_core::{
    backtest_positions, BacktestConfig, BacktestError, BacktestResult, GateTable,
    LogReturnTable, PositionTable, PriceTable,
};

use crate::config::{ConfigError, ExperimentConfig, StrategyConfig};
use crate::data_loader::{load_price_data, LoadError, LoadOptions, PriceData};
use crate::metrics::{summarize, MetricsSettings, PerformanceSummary};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] LoadError),

    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),

    #[error("not enough data: need at least {needed} rows, have {available}")]
    InsufficientData { needed: usize, available: usize },
}

/// Engine and metrics settings shared by every run in an experiment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSettings {
    pub backtest: BacktestConfig,
    pub metrics: MetricsSettings,
}

impl RunSettings {
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            backtest: config.backtest.engine_config(),
            metrics: config.metrics,
        }
    }
}

/// Target positions for a strategy, plus the volatility gate when one applies.
#[derive(Debug, Clone)]
pub struct StrategyPositions {
    pub positions: PositionTable,
    pub gate: Option<GateTable>,
}

/// Turn a strategy config into target positions.
pub fn build_positions(
    strategy: &StrategyConfig,
    prices: &PriceTable,
    log_returns: &LogReturnTable,
) -> StrategyPositions {
    match *strategy {
        StrategyConfig::Momentum {
            lookback,
            threshold,
        } => StrategyPositions {
            positions: SignThreshold::new(threshold)
                .apply(&MomentumSignal::new(lookback).compute(prices)),
            gate: None,
        },
        StrategyConfig::MeanReversion {
            lookback,
            entry_z,
            exit_z,
        } => StrategyPositions {
            positions: ZScoreEntryExit::new(entry_z, exit_z)
                .apply(&ZScoreSignal::new(lookback).compute(prices)),
            gate: None,
        },
        StrategyConfig::VolFilteredMomentum {
            lookback,
            threshold,
            vol_lookback,
            vol_threshold,
        } => {
            let base = SignThreshold::new(threshold)
                .apply(&MomentumSignal::new(lookback).compute(prices));
            let gate = VolatilityGate::new(vol_lookback, vol_threshold).compute(log_returns);
            StrategyPositions {
                positions: apply_gate(&base, &gate),
                gate: Some(gate),
            }
        }
    }
}

/// Complete result of one strategy run.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyRun {
    pub result: BacktestResult,
    pub summary: PerformanceSummary,
    /// Share of periods the volatility gate was open, per instrument.
    pub gate_fraction: Option<Vec<(String, f64)>>,
}

impl StrategyRun {
    /// Mean open-gate share across instruments.
    pub fn avg_gate(&self) -> Option<f64> {
        let fractions = self.gate_fraction.as_ref()?;
        if fractions.is_empty() {
            return None;
        }
        Some(fractions.iter().map(|(_, f)| f).sum::<f64>() / fractions.len() as f64)
    }
}

/// Run one strategy over pre-loaded data. No I/O.
pub fn run_strategy(
    name: &str,
    data: &PriceData,
    strategy: &StrategyConfig,
    settings: &RunSettings,
) -> Result<StrategyRun, RunError> {
    strategy.validate()?;
    let built = build_positions(strategy, &data.prices, &data.log_returns);
    let result = backtest_positions(&data.log_returns, &built.positions, &settings.backtest)?;
    let summary = summarize(name, &result, &settings.metrics);

    info!(
        strategy = name,
        final_equity = summary.final_equity,
        sharpe = summary.sharpe,
        "strategy run complete"
    );

    Ok(StrategyRun {
        result,
        summary,
        gate_fraction: built.gate.as_ref().map(gate_fraction),
    })
}

/// Momentum, mean reversion and vol-filtered momentum at their usual settings.
pub fn default_comparison() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::Momentum {
            lookback: 20,
            threshold: 0.0,
        },
        StrategyConfig::MeanReversion {
            lookback: 20,
            entry_z: 1.0,
            exit_z: 0.2,
        },
        StrategyConfig::VolFilteredMomentum {
            lookback: 60,
            threshold: 0.0,
            vol_lookback: 20,
            vol_threshold: 0.02,
        },
    ]
}

/// Run every strategy over the same data. Runs come back in input order.
///
/// Any invalid config fails the whole comparison before a backtest starts.
pub fn compare_strategies(
    data: &PriceData,
    strategies: &[StrategyConfig],
    settings: &RunSettings,
) -> Result<Vec<StrategyRun>, RunError> {
    for strategy in strategies {
        strategy.validate()?;
    }
    info!(count = strategies.len(), "comparing strategies");
    strategies
        .par_iter()
        .map(|strategy| run_strategy(&strategy.label(), data, strategy, settings))
        .collect()
}

/// Resolve data for `config` and run its strategy.
pub fn run_experiment(
    config: &ExperimentConfig,
    provider: Option<&dyn PriceProvider>,
    opts: &LoadOptions,
) -> Result<(PriceData, StrategyRun), RunError> {
    config.validate()?;
    let cache = CsvCache::new(&config.data.cache_dir);
    let data = load_price_data(&config.data.price_query(), &cache, provider, opts)?;
    info!(
        run_id = %config.run_id()?,
        source = %data.source,
        rows = data.prices.n_rows(),
        "data ready"
    );
    let run = run_strategy(
        &config.strategy.label(),
        &data,
        &config.strategy,
        &RunSettings::from_config(config),
    )?;
    Ok((data, run))
}
