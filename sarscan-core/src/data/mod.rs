//! Market data: providers and bar cleaning.

pub mod clean;
pub mod csv_import;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use clean::clean_bars;
pub use csv_import::CsvProvider;
pub use provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
pub use synthetic::SyntheticProvider;
pub use yahoo::{normalize_symbol, YahooProvider};
