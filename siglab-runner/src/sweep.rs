//! Parameter sweeps over pre-loaded data.
//!
//! - Momentum lookback grid search (parallel with rayon)
//! - Volatility-threshold sensitivity for vol-filtered momentum

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::StrategyConfig;
use crate::data_loader::PriceData;
use crate::metrics::PerformanceSummary;
use crate::runner::{run_strategy, RunError, RunSettings};

/// Lookbacks searched by default.
pub const DEFAULT_LOOKBACKS: [usize; 7] = [5, 10, 20, 40, 60, 120, 180];

/// Volatility ceilings tested by default.
pub const DEFAULT_VOL_THRESHOLDS: [f64; 3] = [0.015, 0.020, 0.025];

#[derive(Debug, Clone, Serialize)]
pub struct LookbackRow {
    pub lookback: usize,
    pub summary: PerformanceSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolThresholdRow {
    pub vol_threshold: f64,
    pub summary: PerformanceSummary,
    /// Mean share of periods with the gate open.
    pub avg_gate: f64,
}

/// Run momentum for each lookback; rows come back sorted by lookback.
pub fn sweep_momentum_lookbacks(
    data: &PriceData,
    lookbacks: &[usize],
    threshold: f64,
    settings: &RunSettings,
) -> Result<Vec<LookbackRow>, RunError> {
    info!(grid = ?lookbacks, "sweeping momentum lookbacks");
    let mut rows = lookbacks
        .par_iter()
        .map(|&lookback| {
            let strategy = StrategyConfig::Momentum {
                lookback,
                threshold,
            };
            let run = run_strategy(&strategy.label(), data, &strategy, settings)?;
            Ok(LookbackRow {
                lookback,
                summary: run.summary,
            })
        })
        .collect::<Result<Vec<_>, RunError>>()?;
    rows.sort_by_key(|r| r.lookback);
    Ok(rows)
}

/// Vol-filtered momentum at each volatility ceiling, in input order.
pub fn sweep_vol_thresholds(
    data: &PriceData,
    lookback: usize,
    vol_lookback: usize,
    thresholds: &[f64],
    settings: &RunSettings,
) -> Result<Vec<VolThresholdRow>, RunError> {
    info!(lookback, vol_lookback, grid = ?thresholds, "sweeping volatility thresholds");
    thresholds
        .par_iter()
        .map(|&vol_threshold| {
            let strategy = StrategyConfig::VolFilteredMomentum {
                lookback,
                threshold: 0.0,
                vol_lookback,
                vol_threshold,
            };
            let run = run_strategy(&strategy.label(), data, &strategy, settings)?;
            Ok(VolThresholdRow {
                vol_threshold,
                avg_gate: run.avg_gate().unwrap_or(f64::NAN),
                summary: run.summary,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::synthetic_prices;
    use siglab_core::data::DataSource;

    fn data() -> PriceData {
        let start = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let prices = synthetic_prices(&["SPY".into()], start, None).unwrap();
        PriceData::new(prices, DataSource::Synthetic).trimmed()
    }

    #[test]
    fn lookback_rows_sorted() {
        let rows =
            sweep_momentum_lookbacks(&data(), &[60, 5, 20], 0.0, &RunSettings::default()).unwrap();
        let lookbacks: Vec<usize> = rows.iter().map(|r| r.lookback).collect();
        assert_eq!(lookbacks, vec![5, 20, 60]);
        assert_eq!(rows[0].summary.strategy, "Momentum (5)");
    }

    #[test]
    fn tighter_ceiling_closes_gate_more() {
        let rows = sweep_vol_thresholds(
            &data(),
            60,
            20,
            &DEFAULT_VOL_THRESHOLDS,
            &RunSettings::default(),
        )
        .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].avg_gate <= rows[1].avg_gate);
        assert!(rows[1].avg_gate <= rows[2].avg_gate);
        assert!(rows.iter().all(|r| (0.0..=1.0).contains(&r.avg_gate)));
    }

    #[test]
    fn lookback_sweep_runs_on_full_history() {
        let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let index = (0..30).map(|i| base + chrono::Duration::days(i)).collect();
        let values = (0..30).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let prices = siglab_core::Frame::new(index, vec!["SPY".into()], vec![values]).unwrap();
        let full = PriceData::new(prices, DataSource::Synthetic);
        let settings = RunSettings::default();

        let rows = sweep_momentum_lookbacks(&full, &[5], 0.0, &settings).unwrap();
        let strategy = StrategyConfig::Momentum {
            lookback: 5,
            threshold: 0.0,
        };
        let on_full = run_strategy("full", &full, &strategy, &settings).unwrap();
        let on_trimmed = run_strategy("trimmed", &full.trimmed(), &strategy, &settings).unwrap();

        assert_eq!(rows[0].summary.final_equity, on_full.summary.final_equity);
        // the first price row feeds the signal, so the long starts one row sooner
        assert!(rows[0].summary.final_equity > on_trimmed.summary.final_equity);
    }

    #[test]
    fn invalid_lookback_fails_whole_sweep() {
        let result = sweep_momentum_lookbacks(&data(), &[0, 5], 0.0, &RunSettings::default());
        assert!(matches!(result, Err(RunError::Config(_))));
    }
}
