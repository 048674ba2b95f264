//! Rolling-window robustness analysis.
//!
//! The strategy is re-run from scratch on each `[start, start + window_len)`
//! slice of the trimmed data, advancing `step` rows at a time while the window
//! still fits. Signals inside a window only see that window's prices.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use siglab_core::backtest_positions;

use crate::config::StrategyConfig;
use crate::data_loader::PriceData;
use crate::metrics::{describe, summarize, Describe, PerformanceSummary};
use crate::runner::{build_positions, RunError, RunSettings};

// ─── Configuration ───────────────────────────────────────────────────

/// Window geometry in rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Rows per window (default 756, about three years of daily bars).
    pub window_len: usize,
    /// Rows between window starts (default 21, about one month).
    pub step: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_len: 756,
            step: 21,
        }
    }
}

impl WindowConfig {
    pub fn new(window_len: usize, step: usize) -> Self {
        assert!(window_len >= 2, "window_len must be >= 2");
        assert!(step >= 1, "step must be >= 1");
        Self { window_len, step }
    }

    /// Start rows of every window that fits in `n_rows`.
    pub fn starts(&self, n_rows: usize) -> Vec<usize> {
        if n_rows < self.window_len {
            return Vec::new();
        }
        (0..=n_rows - self.window_len).step_by(self.step).collect()
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Metrics for one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowResult {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub sharpe: f64,
    pub annual_return: f64,
    pub annual_vol: f64,
    pub max_drawdown: f64,
    pub final_equity: f64,
}

/// Base and vol-gated momentum Sharpe for one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolCompareRow {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub sharpe_base: f64,
    pub sharpe_filtered: f64,
}

/// Distribution of per-window metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RollingSummary {
    pub sharpe: Describe,
    pub annual_return: Describe,
    pub max_drawdown: Describe,
}

impl RollingSummary {
    pub fn from_windows(windows: &[WindowResult]) -> Self {
        let collect = |f: fn(&WindowResult) -> f64| windows.iter().map(f).collect::<Vec<_>>();
        Self {
            sharpe: describe(&collect(|w| w.sharpe)),
            annual_return: describe(&collect(|w| w.annual_return)),
            max_drawdown: describe(&collect(|w| w.max_drawdown)),
        }
    }
}

// ─── Analysis ────────────────────────────────────────────────────────

/// Evaluate `strategy` on every rolling window of `data`.
pub fn rolling_window_analysis(
    data: &PriceData,
    strategy: &StrategyConfig,
    window: &WindowConfig,
    settings: &RunSettings,
) -> Result<Vec<WindowResult>, RunError> {
    strategy.validate()?;
    let data = data.trimmed();
    check_length(&data, window, strategy.warmup())?;

    let starts = window.starts(data.log_returns.n_rows());
    info!(
        strategy = %strategy.label(),
        windows = starts.len(),
        window_len = window.window_len,
        step = window.step,
        "rolling-window analysis"
    );

    starts
        .into_iter()
        .map(|start| {
            let slice = window_slice(&data, start, window.window_len);
            let summary = evaluate(&slice, strategy, settings)?;
            let (window_start, window_end) = bounds(&slice);
            Ok(WindowResult {
                window_start,
                window_end,
                sharpe: summary.sharpe,
                annual_return: summary.annual_return,
                annual_vol: summary.annual_vol,
                max_drawdown: summary.max_drawdown,
                final_equity: summary.final_equity,
            })
        })
        .collect()
}

/// Momentum with and without the volatility gate, window by window.
///
/// The gate is computed from each window's own returns.
pub fn compare_vol_filter(
    data: &PriceData,
    lookback: usize,
    vol_lookback: usize,
    vol_threshold: f64,
    window: &WindowConfig,
    settings: &RunSettings,
) -> Result<Vec<VolCompareRow>, RunError> {
    let base = StrategyConfig::Momentum {
        lookback,
        threshold: 0.0,
    };
    let filtered = StrategyConfig::VolFilteredMomentum {
        lookback,
        threshold: 0.0,
        vol_lookback,
        vol_threshold,
    };
    filtered.validate()?;
    let data = data.trimmed();
    check_length(&data, window, filtered.warmup())?;

    let starts = window.starts(data.log_returns.n_rows());
    info!(
        lookback,
        vol_lookback,
        vol_threshold,
        windows = starts.len(),
        "rolling vol-filter comparison"
    );

    starts
        .into_iter()
        .map(|start| {
            let slice = window_slice(&data, start, window.window_len);
            let (window_start, window_end) = bounds(&slice);
            Ok(VolCompareRow {
                window_start,
                window_end,
                sharpe_base: evaluate(&slice, &base, settings)?.sharpe,
                sharpe_filtered: evaluate(&slice, &filtered, settings)?.sharpe,
            })
        })
        .collect()
}

fn check_length(data: &PriceData, window: &WindowConfig, warmup: usize) -> Result<(), RunError> {
    let needed = window.window_len + warmup;
    let available = data.log_returns.n_rows();
    if available < needed {
        return Err(RunError::InsufficientData { needed, available });
    }
    Ok(())
}

/// Rows `[start, start + len)` of trimmed data, whose prices and returns share an index.
fn window_slice(data: &PriceData, start: usize, len: usize) -> PriceData {
    PriceData {
        prices: data.prices.slice_rows(start..start + len),
        log_returns: data.log_returns.slice_rows(start..start + len),
        source: data.source,
        dataset_hash: data.dataset_hash.clone(),
    }
}

fn bounds(slice: &PriceData) -> (NaiveDate, NaiveDate) {
    let index = slice.log_returns.index();
    // windows are never empty
    (index[0], index[index.len() - 1])
}

fn evaluate(
    slice: &PriceData,
    strategy: &StrategyConfig,
    settings: &RunSettings,
) -> Result<PerformanceSummary, RunError> {
    let built = build_positions(strategy, &slice.prices, &slice.log_returns);
    let result = backtest_positions(&slice.log_returns, &built.positions, &settings.backtest)?;
    let summary = summarize(&strategy.label(), &result, &settings.metrics);
    debug!(
        window_end = %bounds(slice).1,
        sharpe = summary.sharpe,
        "window evaluated"
    );
    Ok(summary)
}
