//! Siglab Runner — experiment orchestration on top of `siglab-core`.
//!
//! This crate provides:
//! - Performance metrics and distribution summaries
//! - TOML experiment configuration
//! - Price loading with cache/download/synthetic fallback
//! - Single-strategy runner and side-by-side strategy comparison
//! - Signal and position inspection
//! - Lookback and volatility-threshold sweeps
//! - Rolling-window robustness analysis
//! - CSV/JSON report export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod inspect;
pub mod metrics;
pub mod rolling;
pub mod runner;
pub mod sweep;

pub use config::{
    BacktestSettings, ConfigError, DataConfig, ExperimentConfig, RunId, StrategyConfig,
};
pub use data_loader::{load_price_data, synthetic_prices, LoadError, LoadOptions, PriceData};
pub use inspect::{
    inspect_signals, position_activity, InspectParams, PositionActivity, SignalSnapshot,
};
pub use metrics::{describe, summarize, Describe, MetricsSettings, PerformanceSummary};
pub use rolling::{
    compare_vol_filter, rolling_window_analysis, RollingSummary, VolCompareRow, WindowConfig,
    WindowResult,
};
pub use runner::{
    build_positions, compare_strategies, default_comparison, run_experiment, run_strategy,
    RunError, RunSettings, StrategyPositions, StrategyRun,
};
pub use sweep::{
    sweep_momentum_lookbacks, sweep_vol_thresholds, LookbackRow, VolThresholdRow,
    DEFAULT_LOOKBACKS, DEFAULT_VOL_THRESHOLDS,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn price_data_is_send_sync() {
        assert_send::<PriceData>();
        assert_sync::<PriceData>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ExperimentConfig>();
        assert_sync::<ExperimentConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
        assert_send::<RunSettings>();
        assert_sync::<RunSettings>();
    }

    #[test]
    fn run_results_are_send_sync() {
        assert_send::<StrategyRun>();
        assert_sync::<StrategyRun>();
        assert_send::<WindowResult>();
        assert_sync::<WindowResult>();
        assert_send::<SignalSnapshot>();
        assert_sync::<SignalSnapshot>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
