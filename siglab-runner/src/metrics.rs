//! Performance metrics — pure functions over strategy log returns and equity.
//!
//! Every metric drops undefined (NaN) observations first. An input with no
//! defined observations yields NaN rather than an error, and every division
//! by a computed spread is guarded.

use serde::{Deserialize, Serialize};
use siglab_core::BacktestResult;

/// Trading days in a year.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Risk-free rate and annualization used by [`summarize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Annual risk-free rate, e.g. 0.02 for 2%.
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }
}

/// One labeled row for cross-strategy comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub strategy: String,
    pub final_equity: f64,
    pub annual_return: f64,
    pub annual_vol: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
}

/// Bundle the headline metrics for one backtest.
pub fn summarize(
    name: &str,
    result: &BacktestResult,
    settings: &MetricsSettings,
) -> PerformanceSummary {
    let lr = result.strategy_log_returns().values();
    let ppy = settings.periods_per_year;
    PerformanceSummary {
        strategy: name.to_string(),
        final_equity: result.final_equity(),
        annual_return: annualized_return(lr, ppy),
        annual_vol: annualized_volatility(lr, ppy),
        sharpe: sharpe_ratio(lr, settings.risk_free_rate, ppy),
        max_drawdown: max_drawdown(result.equity_curve().values()),
        win_rate: win_rate(lr),
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// exp(mean(log returns) · periods_per_year) − 1.
pub fn annualized_return(log_returns: &[f64], periods_per_year: f64) -> f64 {
    (mean(log_returns) * periods_per_year).exp() - 1.0
}

/// Population standard deviation of log returns, scaled by √periods_per_year.
pub fn annualized_volatility(log_returns: &[f64], periods_per_year: f64) -> f64 {
    population_std(log_returns) * periods_per_year.sqrt()
}

/// Annualized Sharpe ratio of log returns over a per-period risk-free rate.
///
/// Sharpe = √ppy · mean(excess) / std(excess), excess = r − rf_annual / ppy.
/// NaN when the excess returns have zero or undefined spread.
pub fn sharpe_ratio(log_returns: &[f64], risk_free_rate_annual: f64, periods_per_year: f64) -> f64 {
    let rf = risk_free_rate_annual / periods_per_year;
    let excess: Vec<f64> = defined(log_returns).map(|r| r - rf).collect();
    let vol = population_std(&excess);
    if vol == 0.0 || vol.is_nan() {
        return f64::NAN;
    }
    periods_per_year.sqrt() * mean(&excess) / vol
}

/// equity(t) / max(equity(..=t)) − 1 for each timestamp.
///
/// NaN entries stay NaN and don't move the running peak.
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&e| {
            if e.is_nan() {
                return f64::NAN;
            }
            peak = peak.max(e);
            e / peak - 1.0
        })
        .collect()
}

/// Deepest drawdown, a value <= 0 (e.g. -0.32 for a 32% peak-to-trough loss).
pub fn max_drawdown(equity: &[f64]) -> f64 {
    defined(&drawdown_series(equity)).fold(f64::NAN, f64::min)
}

/// Fraction of periods with a strictly positive return.
pub fn win_rate(log_returns: &[f64]) -> f64 {
    let (wins, total) = defined(log_returns).fold((0usize, 0usize), |(w, n), r| {
        (w + usize::from(r > 0.0), n + 1)
    });
    if total == 0 {
        return f64::NAN;
    }
    wins as f64 / total as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

fn defined(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| !v.is_nan())
}

/// Mean of the defined values; NaN when there are none.
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = defined(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        return f64::NAN;
    }
    sum / n as f64
}

/// Population (N) standard deviation of the defined values.
///
/// Identical values give exactly 0.0 so the Sharpe guard can't be defeated
/// by rounding in the mean.
pub fn population_std(values: &[f64]) -> f64 {
    spread(values, 0)
}

/// Sample (N−1) standard deviation of the defined values.
pub fn sample_std(values: &[f64]) -> f64 {
    spread(values, 1)
}

fn spread(values: &[f64], ddof: usize) -> f64 {
    let xs: Vec<f64> = defined(values).collect();
    if xs.len() <= ddof {
        return f64::NAN;
    }
    if xs.iter().all(|&x| x == xs[0]) {
        return 0.0;
    }
    let m = xs.iter().sum::<f64>() / xs.len() as f64;
    let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (xs.len() - ddof) as f64).sqrt()
}

// ─── Distribution summary ───────────────────────────────────────────

/// Count, moments and quartiles of a set of per-window statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample (N−1) standard deviation.
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

/// Summary statistics of the defined values, quartiles by linear interpolation.
pub fn describe(values: &[f64]) -> Describe {
    let mut sorted: Vec<f64> = defined(values).collect();
    sorted.sort_by(f64::total_cmp);
    Describe {
        count: sorted.len(),
        mean: mean(&sorted),
        std: sample_std(&sorted),
        min: sorted.first().copied().unwrap_or(f64::NAN),
        p25: percentile(&sorted, 0.25),
        median: percentile(&sorted, 0.5),
        p75: percentile(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
