//! Data boundary: price providers, the CSV cache, and log-return computation.

pub mod align;
pub mod cache;
pub mod provider;
pub mod returns;
pub mod yahoo;

pub use align::{align_on_union, drop_empty_rows};
pub use cache::{read_prices, write_prices, CsvCache};
pub use provider::{DataError, DataSource, Interval, PriceField, PriceProvider, PriceQuery};
pub use returns::compute_log_returns;
pub use yahoo::YahooProvider;
