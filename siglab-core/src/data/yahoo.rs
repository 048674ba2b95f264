//! Yahoo Finance price provider.
//!
//! Fetches bars from Yahoo's v8 chart API one symbol at a time, extracts the
//! requested price field, and aligns all symbols on the union of their dates.
//! Transient failures (timeouts, 429, 5xx) are retried with exponential backoff.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::align::align_on_union;
use super::provider::{DataError, PriceField, PriceProvider, PriceQuery};
use crate::domain::PriceTable;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance price provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Build the chart API URL for a symbol and query range.
    fn chart_url(symbol: &str, query: &PriceQuery) -> String {
        let start_ts = query.start.and_time(NaiveTime::default()).and_utc().timestamp();
        let end_ts = match query.end {
            Some(end) => end
                .and_hms_opt(23, 59, 59)
                .map(|dt| dt.and_utc().timestamp())
                .unwrap_or(start_ts),
            None => Utc::now().timestamp(),
        };
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval={}\
             &includeAdjustedClose=true",
            query.interval
        )
    }

    /// Parse the chart API response into `(date, price)` observations.
    ///
    /// Bars without a value for `field` become NaN; the alignment step drops
    /// rows that end up missing for every symbol.
    fn parse_response(
        symbol: &str,
        resp: ChartResponse,
        field: PriceField,
    ) -> Result<Vec<(NaiveDate, f64)>, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A range with no trading days comes back without timestamps.
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
        let adj_close = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let prices = match field {
            PriceField::Open => quote.open,
            PriceField::High => quote.high,
            PriceField::Low => quote.low,
            PriceField::Close => quote.close,
            PriceField::AdjClose => match adj_close {
                Some(adj) => adj,
                None => {
                    warn!(symbol, "no adjusted close in response, using close");
                    quote.close
                }
            },
        };

        timestamps
            .iter()
            .enumerate()
            .map(|(i, &ts)| {
                let date = chrono::DateTime::from_timestamp(ts, 0)
                    .map(|dt| dt.naive_utc().date())
                    .ok_or_else(|| {
                        DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                    })?;
                let price = prices.get(i).copied().flatten().unwrap_or(f64::NAN);
                Ok((date, price))
            })
            .collect()
    }

    /// Execute a single symbol request with retry logic.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        query: &PriceQuery,
    ) -> Result<Vec<(NaiveDate, f64)>, DataError> {
        let url = Self::chart_url(symbol, query);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying");
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    return Self::parse_response(symbol, chart, query.field);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, query: &PriceQuery) -> Result<PriceTable, DataError> {
        let mut series = Vec::with_capacity(query.symbols.len());
        for symbol in &query.symbols {
            let obs = self.fetch_with_retry(symbol, query)?;
            debug!(symbol = %symbol, rows = obs.len(), "fetched");
            series.push((symbol.clone(), obs));
        }

        let table = align_on_union(series)?;
        if table.is_empty() {
            return Err(DataError::NoData {
                symbols: query.symbols.clone(),
                start: query.start,
            });
        }

        info!(
            symbols = ?query.symbols,
            field = %query.field,
            interval = %query.interval,
            rows = table.n_rows(),
            "downloaded prices"
        );
        Ok(table)
    }
}
