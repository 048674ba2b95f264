//! Domain types: the tables that flow through the pipeline.
//!
//! Every stage consumes and produces a `Frame` keyed by date and instrument;
//! only the cell type changes as data moves from prices to positions.

pub mod position;

pub use position::{InvalidPosition, Position};

use crate::frame::Frame;

/// Positive prices; a missing observation is NaN.
pub type PriceTable = Frame<f64>;

/// ln(p_t) - ln(p_{t-1}); no row for the first price date. Undefined cells are NaN.
pub type LogReturnTable = Frame<f64>;

/// Real-valued indicator readings. `None` means "no signal yet".
pub type SignalTable = Frame<Option<f64>>;

/// Ternary target exposures, not yet lagged.
pub type PositionTable = Frame<Position>;

/// Trade/no-trade mask; `true` allows the position through.
pub type GateTable = Frame<bool>;
