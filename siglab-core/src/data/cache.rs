//! CSV price cache.
//!
//! Layout: `{cache_dir}/prices_{SYM1_SYM2}_{start}.csv`
//!
//! File format: header `date,SYM1,SYM2,...`, one row per date, a blank cell
//! for a missing price. Writes are atomic (write to .tmp, rename into place).

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::provider::DataError;
use crate::domain::PriceTable;
use crate::frame::Frame;

/// File-backed cache keyed by symbol set and start date.
#[derive(Debug, Clone)]
pub struct CsvCache {
    cache_dir: PathBuf,
}

impl CsvCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// `{cache_dir}/prices_{SYM1_SYM2}_{start}.csv`
    pub fn path_for(&self, symbols: &[String], start: NaiveDate) -> PathBuf {
        self.cache_dir.join(format!(
            "prices_{}_{}.csv",
            symbols.join("_"),
            start.format("%Y-%m-%d")
        ))
    }

    pub fn exists(&self, symbols: &[String], start: NaiveDate) -> bool {
        self.path_for(symbols, start).is_file()
    }

    /// Persist `prices` under the key `(symbols, start)`.
    pub fn write(
        &self,
        symbols: &[String],
        start: NaiveDate,
        prices: &PriceTable,
    ) -> Result<PathBuf, DataError> {
        fs::create_dir_all(&self.cache_dir)?;
        let path = self.path_for(symbols, start);
        let tmp_path = path.with_extension("csv.tmp");

        let file = fs::File::create(&tmp_path)?;
        write_prices(file, prices)?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            // Clean up temp file on rename failure
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        debug!(path = %path.display(), rows = prices.n_rows(), "cached prices");
        Ok(path)
    }

    /// Load the table cached under `(symbols, start)`, sorted by date.
    pub fn load(&self, symbols: &[String], start: NaiveDate) -> Result<PriceTable, DataError> {
        let path = self.path_for(symbols, start);
        if !path.is_file() {
            return Err(DataError::NoCachedData {
                path: path.display().to_string(),
            });
        }
        let file = fs::File::open(&path)?;
        read_prices(file)
    }
}

/// Write a price table as CSV: `date` column first, one column per instrument.
pub fn write_prices<W: io::Write>(writer: W, prices: &PriceTable) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(prices.n_cols() + 1);
    header.push("date".to_string());
    header.extend(prices.columns().iter().cloned());
    wtr.write_record(&header)?;

    for (i, date) in prices.index().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(date.format("%Y-%m-%d").to_string());
        for (_, col) in prices.iter_columns() {
            let v = col[i];
            record.push(if v.is_nan() { String::new() } else { v.to_string() });
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Read a price table written by [`write_prices`] (or any CSV whose first
/// column starts with a `YYYY-MM-DD` date).
///
/// Blank and `nan` cells load as NaN. Rows are sorted by date; a repeated
/// date is an error.
pub fn read_prices<R: io::Read>(reader: R) -> Result<PriceTable, DataError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let columns: Vec<String> = rdr
        .headers()?
        .iter()
        .skip(1)
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let raw_date = record.get(0).unwrap_or_default().trim();
        // Tolerates timestamp suffixes like "2015-01-02 00:00:00"
        let date = raw_date
            .get(..10)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .ok_or_else(|| {
                DataError::CacheError(format!("row {}: unparseable date '{raw_date}'", line + 1))
            })?;

        let mut values = Vec::with_capacity(columns.len());
        for j in 0..columns.len() {
            let cell = record.get(j + 1).unwrap_or_default().trim();
            values.push(parse_cell(cell).ok_or_else(|| {
                DataError::CacheError(format!(
                    "row {}: bad value '{cell}' in column '{}'",
                    line + 1,
                    columns[j]
                ))
            })?);
        }
        rows.push((date, values));
    }

    rows.sort_by_key(|(date, _)| *date);

    let index = rows.iter().map(|(d, _)| *d).collect();
    let values = (0..columns.len())
        .map(|j| rows.iter().map(|(_, v)| v[j]).collect())
        .collect();
    Ok(Frame::new(index, columns, values)?)
}

fn parse_cell(cell: &str) -> Option<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    cell.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_cache_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("siglab_test_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> PriceTable {
        Frame::new(
            vec![d(2), d(3), d(4)],
            vec!["SPY".into(), "QQQ".into()],
            vec![vec![470.12, 471.5, 0.1 + 0.2], vec![400.0, f64::NAN, 402.25]],
        )
        .unwrap()
    }

    fn symbols() -> Vec<String> {
        vec!["SPY".into(), "QQQ".into()]
    }

    #[test]
    fn path_joins_symbols_and_start() {
        let cache = CsvCache::new("data/raw");
        let path = cache.path_for(&symbols(), NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
        assert_eq!(path, PathBuf::from("data/raw/prices_SPY_QQQ_2015-01-01.csv"));
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = temp_cache_dir();
        let cache = CsvCache::new(&dir);
        let prices = sample();

        assert!(!cache.exists(&symbols(), d(1)));
        cache.write(&symbols(), d(1), &prices).unwrap();
        assert!(cache.exists(&symbols(), d(1)));

        let loaded = cache.load(&symbols(), d(1)).unwrap();
        assert_eq!(loaded.index(), prices.index());
        assert_eq!(loaded.columns(), prices.columns());
        assert_eq!(loaded.column("SPY").unwrap(), prices.column("SPY").unwrap());
        assert!(loaded.column("QQQ").unwrap()[1].is_nan());
        assert_eq!(loaded.column("QQQ").unwrap()[2], 402.25);

        // no temp file left behind
        assert!(!cache.path_for(&symbols(), d(1)).with_extension("csv.tmp").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let dir = temp_cache_dir();
        let cache = CsvCache::new(&dir);
        let err = cache.load(&symbols(), d(1)).unwrap_err();
        assert!(matches!(err, DataError::NoCachedData { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_sorts_and_accepts_timestamps() {
        let csv = "Date,SPY\n2024-01-03 00:00:00,2.0\n2024-01-02 00:00:00,1.0\n2024-01-04,nan\n";
        let table = read_prices(csv.as_bytes()).unwrap();
        assert_eq!(table.index(), &[d(2), d(3), d(4)]);
        assert_eq!(&table.column("SPY").unwrap()[..2], &[1.0, 2.0]);
        assert!(table.column("SPY").unwrap()[2].is_nan());
    }

    #[test]
    fn read_rejects_duplicate_dates() {
        let csv = "date,SPY\n2024-01-02,1.0\n2024-01-02,1.5\n";
        assert!(matches!(read_prices(csv.as_bytes()), Err(DataError::Frame(_))));
    }

    #[test]
    fn read_rejects_garbage_values() {
        let csv = "date,SPY\n2024-01-02,abc\n";
        assert!(matches!(read_prices(csv.as_bytes()), Err(DataError::CacheError(_))));
    }

    #[test]
    fn missing_cells_written_blank() {
        let mut buf = Vec::new();
        write_prices(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("date,SPY,QQQ\n"));
        assert!(text.contains("2024-01-03,471.5,\n"));
    }
}
