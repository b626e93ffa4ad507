//! Data suppliers and the series normalizer.

pub mod columns;
pub mod csv_file;
pub mod normalize;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use columns::{ColumnMap, Field};
pub use csv_file::CsvProvider;
pub use normalize::{normalize, Normalizer};
pub use provider::{
    DataProvider, DataSource, FetchPeriod, FetchResult, Interval, ProviderError, RawColumns,
};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
