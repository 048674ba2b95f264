//! Date-indexed tables and series.
//!
//! `Frame<T>` is the single tabular shape used across the pipeline: a strictly
//! increasing date index, one named column per instrument, and column-major
//! storage so per-instrument scans walk contiguous memory.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use thiserror::Error;

/// Structural errors raised when a table or series is constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("expected {expected} value columns, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("column '{column}' has {actual} rows but the index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("index is not strictly increasing at row {row} ({date})")]
    UnsortedIndex { row: usize, date: NaiveDate },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
}

/// A date-indexed table with one column per instrument.
///
/// Deserialization goes through [`Frame::new`], so a decoded table obeys the
/// same index and shape rules as a constructed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "FrameParts<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct Frame<T> {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Vec<Vec<T>>,
}

impl<T> Frame<T> {
    /// Build a table from an index, column names, and one value vector per column.
    pub fn new(
        index: Vec<NaiveDate>,
        columns: Vec<String>,
        values: Vec<Vec<T>>,
    ) -> Result<Self, FrameError> {
        validate_index(&index)?;

        if values.len() != columns.len() {
            return Err(FrameError::ColumnCountMismatch {
                expected: columns.len(),
                actual: values.len(),
            });
        }

        let mut seen = HashSet::new();
        for (name, column) in columns.iter().zip(&values) {
            if !seen.insert(name.as_str()) {
                return Err(FrameError::DuplicateColumn(name.clone()));
            }
            if column.len() != index.len() {
                return Err(FrameError::LengthMismatch {
                    column: name.clone(),
                    expected: index.len(),
                    actual: column.len(),
                });
            }
        }

        Ok(Self {
            index,
            columns,
            values,
        })
    }

    /// A table with no rows and no columns.
    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&[T]> {
        self.column_position(name).map(|j| self.values[j].as_slice())
    }

    /// Column by position. Panics if `j` is out of range.
    pub fn column_at(&self, j: usize) -> &[T] {
        &self.values[j]
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.values.get(col).and_then(|c| c.get(row))
    }

    /// Row position of `date`, if present.
    pub fn row_position(&self, date: NaiveDate) -> Option<usize> {
        self.index.binary_search(&date).ok()
    }

    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// Elementwise transform keeping index and columns.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Frame<U> {
        Frame {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|col| col.iter().map(&f).collect())
                .collect(),
        }
    }

    /// Combine two tables of identical shape cell by cell.
    ///
    /// Panics if the shapes differ; reindex `other` first when they may not match.
    pub fn zip_map<U, V>(&self, other: &Frame<U>, f: impl Fn(&T, &U) -> V) -> Frame<V> {
        assert!(
            self.index == other.index && self.columns == other.columns,
            "zip_map requires identical index and columns"
        );
        Frame {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| a.iter().zip(b).map(|(x, y)| f(x, y)).collect())
                .collect(),
        }
    }

    /// Column-wise transform. `f` must return one value per row.
    pub fn map_columns<U>(&self, f: impl Fn(&[T]) -> Vec<U>) -> Frame<U> {
        let values: Vec<Vec<U>> = self.values.iter().map(|col| f(col)).collect();
        debug_assert!(values.iter().all(|c| c.len() == self.index.len()));
        Frame {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values,
        }
    }

    /// Column-wise transform evaluated in parallel across columns.
    ///
    /// Columns carry no data dependency on each other, so each one is handed to
    /// a separate rayon task. `f` must return one value per row.
    pub fn par_map_columns<U>(&self, f: impl Fn(&[T]) -> Vec<U> + Sync) -> Frame<U>
    where
        T: Sync,
        U: Send,
    {
        let values: Vec<Vec<U>> = self.values.par_iter().map(|col| f(col)).collect();
        debug_assert!(values.iter().all(|c| c.len() == self.index.len()));
        Frame {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values,
        }
    }
}

impl<T: Clone> Frame<T> {
    /// Rows in `range`, all columns.
    pub fn slice_rows(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.n_rows());
        let start = range.start.min(end);
        Self {
            index: self.index[start..end].to_vec(),
            columns: self.columns.clone(),
            values: self.values.iter().map(|c| c[start..end].to_vec()).collect(),
        }
    }

    /// Keep only the rows for which `keep(row)` is true.
    pub fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> Self {
        let rows: Vec<usize> = (0..self.n_rows()).filter(|&i| keep(i)).collect();
        Self {
            index: rows.iter().map(|&i| self.index[i]).collect(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|c| rows.iter().map(|&i| c[i].clone()).collect())
                .collect(),
        }
    }

    /// Values of row `i` across all columns.
    pub fn row(&self, i: usize) -> Vec<T> {
        self.values.iter().map(|c| c[i].clone()).collect()
    }

    /// Re-project onto another index and column set.
    ///
    /// Cells present in `self` are copied; every other cell is `fill`.
    /// `index` is expected to be sorted ascending without duplicates.
    pub fn reindex(&self, index: &[NaiveDate], columns: &[String], fill: T) -> Self {
        let rows: HashMap<NaiveDate, usize> = self
            .index
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, i))
            .collect();

        let values = columns
            .iter()
            .map(|name| match self.column(name) {
                Some(src) => index
                    .iter()
                    .map(|d| match rows.get(d) {
                        Some(&i) => src[i].clone(),
                        None => fill.clone(),
                    })
                    .collect(),
                None => vec![fill.clone(); index.len()],
            })
            .collect();

        Self {
            index: index.to_vec(),
            columns: columns.to_vec(),
            values,
        }
    }
}

/// A single date-indexed `f64` series (strategy returns, equity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesParts")]
pub struct Series {
    index: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl Series {
    pub fn new(index: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, FrameError> {
        validate_index(&index)?;
        if values.len() != index.len() {
            return Err(FrameError::LengthMismatch {
                column: "series".into(),
                expected: index.len(),
                actual: values.len(),
            });
        }
        Ok(Self { index, values })
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }
}

#[derive(Deserialize)]
struct FrameParts<T> {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Vec<Vec<T>>,
}

impl<T> TryFrom<FrameParts<T>> for Frame<T> {
    type Error = FrameError;

    fn try_from(parts: FrameParts<T>) -> Result<Self, Self::Error> {
        Frame::new(parts.index, parts.columns, parts.values)
    }
}

#[derive(Deserialize)]
struct SeriesParts {
    index: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TryFrom<SeriesParts> for Series {
    type Error = FrameError;

    fn try_from(parts: SeriesParts) -> Result<Self, Self::Error> {
        Series::new(parts.index, parts.values)
    }
}

fn validate_index(index: &[NaiveDate]) -> Result<(), FrameError> {
    for (row, pair) in index.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(FrameError::UnsortedIndex {
                row: row + 1,
                date: pair[1],
            });
        }
    }
    Ok(())
}
