//! Candle data sources.

mod csv_source;
mod validation;

pub use csv_source::{load_csv, parse_timestamp, CsvCandleSource};
pub use validation::{validate_series, SeriesIssue, SeriesReport};
