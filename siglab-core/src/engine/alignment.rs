//! Position/return alignment policies.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{LogReturnTable, Position, PositionTable};

use super::BacktestError;

/// How positions that don't line up with the returns table are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// Reindex onto the returns; any absent cell is flat.
    #[default]
    PadWithZero,
    /// Every return date and instrument must have a position, and positions
    /// may not name instruments the returns lack. Extra position dates are fine.
    Strict,
}

/// Reindex `positions` onto the index and columns of `returns`.
pub fn align_positions(
    returns: &LogReturnTable,
    positions: &PositionTable,
    policy: AlignmentPolicy,
) -> Result<PositionTable, BacktestError> {
    let missing_dates = returns
        .index()
        .iter()
        .filter(|d| positions.row_position(**d).is_none())
        .count();
    let missing_columns: Vec<String> = returns
        .columns()
        .iter()
        .filter(|c| positions.column(c).is_none())
        .cloned()
        .collect();
    let extra_columns: Vec<String> = positions
        .columns()
        .iter()
        .filter(|c| returns.column(c).is_none())
        .cloned()
        .collect();

    let aligned = missing_dates == 0 && missing_columns.is_empty() && extra_columns.is_empty();
    if !aligned {
        match policy {
            AlignmentPolicy::Strict => {
                return Err(BacktestError::Misaligned {
                    missing_dates,
                    missing_columns,
                    extra_columns,
                });
            }
            AlignmentPolicy::PadWithZero => {
                if !extra_columns.is_empty() {
                    warn!(
                        columns = ?extra_columns,
                        "positions name instruments with no returns; they contribute nothing"
                    );
                }
                debug!(
                    missing_dates,
                    missing_columns = missing_columns.len(),
                    "padding positions with flat exposure"
                );
            }
        }
    }

    Ok(positions.reindex(returns.index(), returns.columns(), Position::Flat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use chrono::NaiveDate;
    use Position::{Flat, Long, Short};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn returns() -> LogReturnTable {
        Frame::new(
            vec![d(5), d(6)],
            vec!["A".into(), "B".into()],
            vec![vec![0.01, 0.02], vec![0.0, -0.01]],
        )
        .unwrap()
    }

    #[test]
    fn pad_fills_missing_cells_flat() {
        let positions =
            Frame::new(vec![d(4), d(5)], vec!["A".into()], vec![vec![Short, Long]]).unwrap();
        let aligned =
            align_positions(&returns(), &positions, AlignmentPolicy::PadWithZero).unwrap();
        assert_eq!(aligned.index(), returns().index());
        assert_eq!(aligned.column("A").unwrap(), &[Long, Flat]);
        assert_eq!(aligned.column("B").unwrap(), &[Flat, Flat]);
    }

    #[test]
    fn pad_drops_unknown_instruments() {
        let positions = Frame::new(
            vec![d(5), d(6)],
            vec!["A".into(), "B".into(), "ZZZ".into()],
            vec![vec![Long; 2], vec![Long; 2], vec![Short; 2]],
        )
        .unwrap();
        let aligned = align_positions(&returns(), &positions, AlignmentPolicy::default()).unwrap();
        assert_eq!(aligned.columns(), returns().columns());
    }

    #[test]
    fn strict_rejects_mismatch() {
        let positions = Frame::new(
            vec![d(5)],
            vec!["A".into(), "C".into()],
            vec![vec![Long], vec![Long]],
        )
        .unwrap();
        let err = align_positions(&returns(), &positions, AlignmentPolicy::Strict).unwrap_err();
        assert_eq!(
            err,
            BacktestError::Misaligned {
                missing_dates: 1,
                missing_columns: vec!["B".into()],
                extra_columns: vec!["C".into()],
            }
        );
    }

    #[test]
    fn strict_allows_leading_position_row() {
        let positions = Frame::new(
            vec![d(4), d(5), d(6)],
            vec!["A".into(), "B".into()],
            vec![vec![Long; 3], vec![Flat; 3]],
        )
        .unwrap();
        let aligned = align_positions(&returns(), &positions, AlignmentPolicy::Strict).unwrap();
        assert_eq!(aligned.n_rows(), 2);
    }

    #[test]
    fn policy_serde_names() {
        let p: AlignmentPolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(p, AlignmentPolicy::Strict);
        assert_eq!(
            serde_json::to_string(&AlignmentPolicy::PadWithZero).unwrap(),
            "\"pad_with_zero\""
        );
    }
}
