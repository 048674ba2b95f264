//! Price loading and data resolution for the runner.
//!
//! Given a price query, resolves a price table with this fallback policy:
//! 1. If a cache file exists (and no forced download) → use it
//! 2. Otherwise, if online and a provider is available → download and cache
//! 3. If no data and `synthetic` → generate a synthetic random walk (tagged)
//! 4. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only mode; runs on it are tagged by source.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siglab_core::data::{
    compute_log_returns, CsvCache, DataError, DataSource, PriceProvider, PriceQuery,
};
use siglab_core::{Frame, LogReturnTable, PriceTable};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached prices at {path} and offline mode is on (try --synthetic)")]
    NoCachedDataOffline { path: String },

    #[error("no cached prices for {symbols:?} and download failed: {reason}")]
    DownloadFailed { symbols: Vec<String>, reason: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how prices are resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic prices when real data is unavailable.
    pub synthetic: bool,
    /// Re-download even if a cache file exists.
    pub force_download: bool,
}

/// Prices, their log returns, and where they came from.
#[derive(Debug, Clone)]
pub struct PriceData {
    pub prices: PriceTable,
    pub log_returns: LogReturnTable,
    pub source: DataSource,
    /// BLAKE3 over dates, columns and values, for tagging results.
    pub dataset_hash: String,
}

impl PriceData {
    pub fn new(prices: PriceTable, source: DataSource) -> Self {
        let log_returns = compute_log_returns(&prices);
        let dataset_hash = compute_dataset_hash(&prices);
        Self {
            prices,
            log_returns,
            source,
            dataset_hash,
        }
    }

    /// Keep only dates where every price and every return is defined, so
    /// prices and returns share one index.
    pub fn trimmed(&self) -> PriceData {
        let complete_prices = self.prices.filter_rows(|i| row_is_complete(&self.prices, i));
        let complete_returns = self
            .log_returns
            .filter_rows(|i| row_is_complete(&self.log_returns, i));

        let prices = complete_prices
            .filter_rows(|i| complete_returns.row_position(complete_prices.index()[i]).is_some());
        let log_returns = complete_returns
            .filter_rows(|i| prices.row_position(complete_returns.index()[i]).is_some());

        PriceData {
            prices,
            log_returns,
            source: self.source,
            dataset_hash: self.dataset_hash.clone(),
        }
    }
}

fn row_is_complete(table: &Frame<f64>, i: usize) -> bool {
    table.iter_columns().all(|(_, col)| col[i].is_finite())
}

/// Resolve prices from the cache, the provider, or the synthetic generator.
pub fn load_price_data(
    query: &PriceQuery,
    cache: &CsvCache,
    provider: Option<&dyn PriceProvider>,
    opts: &LoadOptions,
) -> Result<PriceData, LoadError> {
    let path = cache.path_for(&query.symbols, query.start);

    // Step 1: Try cache
    if !opts.force_download && cache.exists(&query.symbols, query.start) {
        match cache.load(&query.symbols, query.start) {
            Ok(prices) => {
                info!(path = %path.display(), rows = prices.n_rows(), "loaded prices from cache");
                return Ok(PriceData::new(prices, DataSource::Cache));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable cache file, refetching")
            }
        }
    }

    // Step 2: Try download
    let mut failure = None;
    if !opts.offline {
        if let Some(prov) = provider {
            match prov.fetch(query) {
                Ok(prices) => {
                    let written = cache.write(&query.symbols, query.start, &prices)?;
                    info!(
                        provider = prov.name(),
                        path = %written.display(),
                        rows = prices.n_rows(),
                        "downloaded and cached prices"
                    );
                    return Ok(PriceData::new(prices, DataSource::YahooFinance));
                }
                Err(e) => {
                    warn!(provider = prov.name(), error = %e, "download failed");
                    failure = Some(e.to_string());
                }
            }
        }
    }

    // Step 3: Synthetic fallback
    if opts.synthetic {
        warn!(
            symbols = ?query.symbols,
            "generating synthetic prices; results will be tagged as synthetic"
        );
        let prices = synthetic_prices(&query.symbols, query.start, query.end)?;
        return Ok(PriceData::new(prices, DataSource::Synthetic));
    }

    // Step 4: Fail
    if opts.offline {
        return Err(LoadError::NoCachedDataOffline {
            path: path.display().to_string(),
        });
    }
    Err(LoadError::DownloadFailed {
        symbols: query.symbols.clone(),
        reason: failure.unwrap_or_else(|| "no price provider configured".into()),
    })
}

/// Compute a deterministic BLAKE3 hash over all price data.
fn compute_dataset_hash(prices: &PriceTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for date in prices.index() {
        hasher.update(date.to_string().as_bytes());
    }
    for (name, col) in prices.iter_columns() {
        hasher.update(name.as_bytes());
        for v in col {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Weekdays generated when the query has no end date (about five years).
const SYNTHETIC_DEFAULT_DAYS: usize = 5 * 252;

/// Generate a synthetic random walk per symbol on a weekday calendar.
///
/// Each walk starts at 100.0 and is seeded from the symbol name, so the same
/// query always produces the same table.
pub fn synthetic_prices(
    symbols: &[String],
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<PriceTable, DataError> {
    let mut dates = Vec::new();
    let mut current = start;
    loop {
        let done = match end {
            Some(end) => current > end,
            None => dates.len() >= SYNTHETIC_DEFAULT_DAYS,
        };
        if done {
            break;
        }
        // Skip weekends (simple heuristic)
        let weekday = current.weekday();
        if weekday != chrono::Weekday::Sat && weekday != chrono::Weekday::Sun {
            dates.push(current);
        }
        current += chrono::Duration::days(1);
    }

    let values = symbols
        .iter()
        .map(|symbol| {
            // Deterministic seed from symbol name
            let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
            let mut rng = StdRng::from_seed(seed);
            let mut price = 100.0_f64;
            dates
                .iter()
                .map(|_| {
                    let daily_return: f64 = rng.gen_range(-0.03..0.03);
                    price *= 1.0 + daily_return;
                    price
                })
                .collect()
        })
        .collect();

    Ok(Frame::new(dates, symbols.to_vec(), values)?)
}
