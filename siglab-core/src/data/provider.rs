//! Price provider trait, query types, and structured data errors.
//!
//! The `PriceProvider` trait abstracts over price sources (Yahoo Finance, test
//! doubles) so the loader can swap implementations. The cache sits above
//! this trait; providers don't know about the cache.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::PriceTable;
use crate::frame::FrameError;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no price data returned for {symbols:?} from {start}")]
    NoData { symbols: Vec<String>, start: NaiveDate },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no cached prices at {path}")]
    NoCachedData { path: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("data error: {0}")]
    Other(String),
}

/// Which price series to extract from each bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    #[default]
    #[serde(rename = "Adj Close")]
    AdjClose,
}

impl PriceField {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
            PriceField::AdjClose => "Adj Close",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceField {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            "adj close" | "adjclose" => Ok(PriceField::AdjClose),
            other => Err(DataError::Other(format!("unknown price field '{other}'"))),
        }
    }
}

/// Sampling interval of the price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }

    /// Conventional number of periods per year at this interval.
    pub fn periods_per_year(self) -> f64 {
        match self {
            Interval::Daily => 252.0,
            Interval::Weekly => 52.0,
            Interval::Monthly => 12.0,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(Interval::Daily),
            "1wk" => Ok(Interval::Weekly),
            "1mo" => Ok(Interval::Monthly),
            other => Err(DataError::Other(format!("unknown interval '{other}'"))),
        }
    }
}

/// What to fetch: an ordered symbol set over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuery {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    /// Open-ended when `None`: fetch through the latest available bar.
    pub end: Option<NaiveDate>,
    pub field: PriceField,
    pub interval: Interval,
}

impl PriceQuery {
    pub fn new(symbols: Vec<String>, start: NaiveDate) -> Self {
        Self {
            symbols,
            start,
            end: None,
            field: PriceField::default(),
            interval: Interval::default(),
        }
    }
}

/// Where a price table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Cache,
    Synthetic,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::YahooFinance => "yahoo",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        })
    }
}

/// Source of historical prices.
///
/// Returns a table sorted ascending by date with one column per requested
/// symbol, in request order. Rows missing for every symbol are dropped.
/// A query yielding zero rows is `DataError::NoData`.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch(&self, query: &PriceQuery) -> Result<PriceTable, DataError>;
}
