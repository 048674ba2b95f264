//! Stateless sign/threshold rule.

use crate::domain::{Position, PositionTable, SignalTable};

use super::PositionRule;

/// Long when the signal is strictly above `threshold`, short when strictly
/// below `-threshold`, flat otherwise. Ties at ±threshold and missing
/// signals are flat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignThreshold {
    pub threshold: f64,
}

impl SignThreshold {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn classify(&self, reading: Option<f64>) -> Position {
        match reading {
            Some(s) if s > self.threshold => Position::Long,
            Some(s) if s < -self.threshold => Position::Short,
            _ => Position::Flat,
        }
    }
}

impl Default for SignThreshold {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl PositionRule for SignThreshold {
    fn name(&self) -> &str {
        "sign_threshold"
    }

    fn apply(&self, signal: &SignalTable) -> PositionTable {
        signal.map(|&reading| self.classify(reading))
    }
}
