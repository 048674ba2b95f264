//! Z-score entry/exit rule with a hysteresis band.
//!
//! Each instrument runs its own three-state machine (FLAT, LONG, SHORT) over
//! its readings in time order:
//!
//! 1. no reading → emit FLAT, keep the held state untouched
//! 2. |z| < exit_z → held := FLAT
//! 3. z > entry_z → held := SHORT; z < -entry_z → held := LONG; else hold
//! 4. emit held
//!
//! Step 1 means a gap in the signal shows as a flat period in the output while
//! the machine resumes from its pre-gap state once readings return.

use crate::domain::{Position, PositionTable, SignalTable};
use tracing::{debug, warn};

use super::PositionRule;

/// Per-instrument hysteresis state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisState {
    entry_z: f64,
    exit_z: f64,
    held: Position,
}

impl HysteresisState {
    pub fn new(entry_z: f64, exit_z: f64) -> Self {
        Self {
            entry_z,
            exit_z,
            held: Position::Flat,
        }
    }

    /// State carried into the next step.
    pub fn held(&self) -> Position {
        self.held
    }

    /// Advance one period and return the emitted position.
    pub fn step(&mut self, reading: Option<f64>) -> Position {
        let Some(z) = reading.filter(|z| !z.is_nan()) else {
            return Position::Flat;
        };

        if z.abs() < self.exit_z {
            self.held = Position::Flat;
        } else if z > self.entry_z {
            self.held = Position::Short;
        } else if z < -self.entry_z {
            self.held = Position::Long;
        }

        self.held
    }
}

/// Stateful mean-reversion rule driven by z-score readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreEntryExit {
    pub entry_z: f64,
    pub exit_z: f64,
}

impl ZScoreEntryExit {
    /// `entry_z` should exceed `exit_z`; otherwise the band is degenerate and
    /// the rule runs as-is with a warning.
    pub fn new(entry_z: f64, exit_z: f64) -> Self {
        if !(entry_z > exit_z) {
            warn!(
                entry_z,
                exit_z, "entry_z <= exit_z: hysteresis band is degenerate"
            );
        }
        Self { entry_z, exit_z }
    }

    pub fn default_params() -> Self {
        Self::new(1.0, 0.2)
    }

    /// Run one instrument's readings through a fresh state machine.
    pub fn run(&self, readings: &[Option<f64>]) -> Vec<Position> {
        let mut state = HysteresisState::new(self.entry_z, self.exit_z);
        readings.iter().map(|&z| state.step(z)).collect()
    }
}

impl PositionRule for ZScoreEntryExit {
    fn name(&self) -> &str {
        "zscore_entry_exit"
    }

    fn apply(&self, signal: &SignalTable) -> PositionTable {
        debug!(
            entry_z = self.entry_z,
            exit_z = self.exit_z,
            instruments = signal.n_cols(),
            "running hysteresis rule"
        );
        signal.par_map_columns(|readings| self.run(readings))
    }
}
