//! DataSetIQ core: a blocking client for the DataSetIQ time-series API.
//!
//! This crate contains the data-retrieval and analysis pipeline:
//! - Transport with typed error mapping and retry/backoff
//! - Cursor pagination over JSON pages and CSV exports
//! - Series normalization from ids, frames or named columns
//! - Feature engineering (momentum, YoY, lags, rolling stats, z-score)
//! - Multi-series alignment with two-pass imputation
//! - Insight summaries

pub mod align;
pub mod client;
pub mod config;
pub mod error;
pub mod features;
pub mod impute;
pub mod insight;
pub mod normalize;
pub mod pagination;
pub mod search;
pub mod series;
pub mod stats;
pub mod table;
pub mod transport;

pub use align::{build_ml_table, FeatureMode, MlOptions};
pub use client::{Client, GetOptions};
pub use config::{ClientConfig, Settings};
pub use error::DataError;
pub use features::{add_features, FeatureFamily, FeatureOptions, FeatureSet};
pub use impute::{ImputeStep, ImputeStrategy};
pub use insight::{summarize, Insight, Lookback, Trend};
pub use normalize::{normalize, SeriesInput, SeriesSource};
pub use search::{SearchPage, SearchResult};
pub use series::{Record, TimeSeries};
pub use table::{JoinMode, Table};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the client and its data types can cross threads.
    ///
    /// The aligner fetches on the rayon pool through `&dyn SeriesSource`, so
    /// `Client` must stay `Sync`.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Client>();
        require_sync::<Client>();
        require_send::<Settings>();
        require_sync::<Settings>();
        require_send::<TimeSeries>();
        require_sync::<TimeSeries>();
        require_send::<Table>();
        require_sync::<Table>();
        require_send::<DataError>();
        require_sync::<DataError>();
        require_send::<Insight>();
        require_sync::<Insight>();
        require_send::<MlOptions>();
        require_sync::<MlOptions>();
    }

    /// `Client` is usable wherever a series source is expected.
    #[test]
    fn client_is_a_series_source() {
        fn _takes_source(_: &dyn SeriesSource) {}
        fn _check(client: &Client) {
            _takes_source(client);
        }
    }
}
