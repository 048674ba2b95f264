//! Position rules: signal table in, ternary target positions out.
//!
//! Two rules ship with the crate:
//! - `SignThreshold` — stateless, elementwise comparison against ±threshold
//! - `ZScoreEntryExit` — per-instrument hysteresis state machine

pub mod hysteresis;
pub mod threshold;

pub use hysteresis::{HysteresisState, ZScoreEntryExit};
pub use threshold::SignThreshold;

use crate::domain::{PositionTable, SignalTable};

/// Maps a signal table onto target positions with the same index and columns.
pub trait PositionRule: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, signal: &SignalTable) -> PositionTable;
}

/// +1 above `threshold`, -1 below `-threshold`, 0 otherwise (including no signal).
pub fn sign_threshold_rule(signal: &SignalTable, threshold: f64) -> PositionTable {
    SignThreshold::new(threshold).apply(signal)
}

/// Enter short above `entry_z`, long below `-entry_z`, exit inside `±exit_z`.
pub fn zscore_entry_exit_rule(z: &SignalTable, entry_z: f64, exit_z: f64) -> PositionTable {
    ZScoreEntryExit::new(entry_z, exit_z).apply(z)
}
