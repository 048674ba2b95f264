//! Multi-symbol time alignment.
//!
//! Given per-symbol observations, build one price table on the union of their
//! dates. Missing observations are NaN (no forward-fill of price data).

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

use crate::domain::PriceTable;
use crate::frame::{Frame, FrameError};

/// Align `(symbol, observations)` pairs on the union of their dates.
///
/// Column order follows the input order. Rows where every symbol is missing
/// (or NaN) are dropped. A date repeated within one symbol keeps the last value.
pub fn align_on_union(
    series: Vec<(String, Vec<(NaiveDate, f64)>)>,
) -> Result<PriceTable, FrameError> {
    let dates: Vec<NaiveDate> = series
        .iter()
        .flat_map(|(_, obs)| obs.iter().map(|(d, _)| *d))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut columns = Vec::with_capacity(series.len());
    let mut values = Vec::with_capacity(series.len());
    for (symbol, obs) in series {
        let by_date: HashMap<NaiveDate, f64> = obs.into_iter().collect();
        values.push(
            dates
                .iter()
                .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
                .collect::<Vec<f64>>(),
        );
        columns.push(symbol);
    }

    let table = Frame::new(dates, columns, values)?;
    Ok(drop_empty_rows(&table))
}

/// Drop rows whose values are all NaN.
pub fn drop_empty_rows(table: &PriceTable) -> PriceTable {
    table.filter_rows(|i| {
        table
            .iter_columns()
            .any(|(_, col)| !col[i].is_nan())
    })
}
