//! Vectorized backtest engine.
//!
//! The engine takes target positions and asset log returns and produces the
//! strategy's per-period log returns and compounded equity curve:
//!
//! 1. Align positions onto the returns' dates and instruments
//! 2. Lag one period: the return at `t` is earned by the position set at `t-1`
//! 3. Equal-weight across instruments (`held / N`)
//! 4. Subtract turnover cost computed on the unlagged targets
//! 5. Compound: `equity = exp(cumsum(log returns))`, first value pinned to 1.0

pub mod alignment;
pub mod backtest;

pub use alignment::{align_positions, AlignmentPolicy};
pub use backtest::{backtest_positions, turnover, BacktestConfig, BacktestError, BacktestResult};
