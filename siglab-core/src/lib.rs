//! Siglab Core — tables, strategy components, backtest engine, and the data boundary.
//!
//! This crate contains the signal→position→portfolio pipeline:
//! - Date-indexed tables (`Frame`) and the typed aliases built on them
//! - Signal generators (momentum ratio, mean-reversion z-score)
//! - Position rules (sign threshold, z-score hysteresis state machine)
//! - Volatility regime gate
//! - Vectorized backtest with one-period lag, equal weight and turnover cost
//! - Price providers, CSV cache, log returns

pub mod components;
pub mod data;
pub mod domain;
pub mod engine;
pub mod frame;
pub mod indicators;

pub use domain::{GateTable, LogReturnTable, Position, PositionTable, PriceTable, SignalTable};
pub use engine::{
    backtest_positions, AlignmentPolicy, BacktestConfig, BacktestError, BacktestResult,
};
pub use frame::{Frame, FrameError, Series};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: tables and components can cross thread boundaries.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Tables
        require_send::<PriceTable>();
        require_sync::<PriceTable>();
        require_send::<SignalTable>();
        require_sync::<SignalTable>();
        require_send::<PositionTable>();
        require_sync::<PositionTable>();
        require_send::<Series>();
        require_sync::<Series>();

        // Engine types
        require_send::<BacktestConfig>();
        require_sync::<BacktestConfig>();
        require_send::<BacktestResult>();
        require_sync::<BacktestResult>();

        // Components
        require_send::<components::MomentumSignal>();
        require_sync::<components::MomentumSignal>();
        require_send::<components::ZScoreSignal>();
        require_sync::<components::ZScoreSignal>();
        require_send::<components::SignThreshold>();
        require_sync::<components::SignThreshold>();
        require_send::<components::ZScoreEntryExit>();
        require_sync::<components::ZScoreEntryExit>();
        require_send::<components::VolatilityGate>();
        require_sync::<components::VolatilityGate>();

        // Data boundary
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CsvCache>();
        require_sync::<data::CsvCache>();
    }

    #[test]
    fn traits_are_object_safe() {
        let signals: Vec<Box<dyn components::SignalGenerator>> = vec![
            Box::new(components::MomentumSignal::default_params()),
            Box::new(components::ZScoreSignal::default_params()),
        ];
        let rules: Vec<Box<dyn components::PositionRule>> = vec![
            Box::new(components::SignThreshold::default()),
            Box::new(components::ZScoreEntryExit::default_params()),
        ];
        assert_eq!(signals[0].name(), "momentum_20");
        assert_eq!(rules[1].name(), "zscore_entry_exit");
    }
}
