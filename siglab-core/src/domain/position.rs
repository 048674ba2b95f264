//! Ternary target exposure.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Target exposure for one instrument in one period: -1, 0 or +1.
///
/// This is a *target*; the backtest engine applies the one-period lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("position value {0} is not one of -1, 0, 1")]
pub struct InvalidPosition(pub i8);

impl Position {
    pub fn value(self) -> i8 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.value())
    }

    /// Sign of `x`; zero and NaN map to `Flat`.
    pub fn from_sign(x: f64) -> Self {
        if x > 0.0 {
            Position::Long
        } else if x < 0.0 {
            Position::Short
        } else {
            Position::Flat
        }
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }

    /// Multiply by a 1/0 gate.
    pub fn gated(self, allowed: bool) -> Self {
        if allowed {
            self
        } else {
            Position::Flat
        }
    }

    /// Absolute change in exposure between two periods (0, 1 or 2).
    pub fn change_from(self, previous: Position) -> f64 {
        f64::from((self.value() - previous.value()).abs())
    }
}

impl From<Position> for i8 {
    fn from(p: Position) -> Self {
        p.value()
    }
}

impl TryFrom<i8> for Position {
    type Error = InvalidPosition;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(Position::Short),
            0 => Ok(Position::Flat),
            1 => Ok(Position::Long),
            other => Err(InvalidPosition(other)),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_roundtrip() {
        for p in [Position::Short, Position::Flat, Position::Long] {
            assert_eq!(Position::try_from(p.value()), Ok(p));
        }
        assert_eq!(Position::try_from(2), Err(InvalidPosition(2)));
    }

    #[test]
    fn from_sign_treats_nan_as_flat() {
        assert_eq!(Position::from_sign(0.3), Position::Long);
        assert_eq!(Position::from_sign(-0.3), Position::Short);
        assert_eq!(Position::from_sign(0.0), Position::Flat);
        assert_eq!(Position::from_sign(f64::NAN), Position::Flat);
    }

    #[test]
    fn change_counts_reversals_twice() {
        assert_eq!(Position::Long.change_from(Position::Short), 2.0);
        assert_eq!(Position::Flat.change_from(Position::Long), 1.0);
        assert_eq!(Position::Long.change_from(Position::Long), 0.0);
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Position::Short).unwrap(), "-1");
        let p: Position = serde_json::from_str("1").unwrap();
        assert_eq!(p, Position::Long);
        assert!(serde_json::from_str::<Position>("3").is_err());
    }
}
