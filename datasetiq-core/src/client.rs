//! High-level client: the entry point most callers need.

use crate::align::{build_ml_table, MlOptions};
use crate::config::{ClientConfig, Settings};
use crate::error::DataError;
use crate::features::{add_features, FeatureOptions};
use crate::insight::{summarize, Insight};
use crate::normalize::{normalize, SeriesInput, SeriesSource};
use crate::pagination::{fetch_all, Endpoint};
use crate::search::SearchPage;
use crate::series::TimeSeries;
use crate::table::Table;
use crate::transport::{HttpTransport, Payload, Requester, Transport};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

type CacheKey = (String, Endpoint, Option<NaiveDate>, Option<NaiveDate>);

/// Options for a single-series fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Drop observations whose value is missing.
    pub drop_missing: bool,
}

/// DataSetIQ client.
///
/// Each call takes one snapshot of the shared `Settings` and uses it for every
/// page it requests, so a key set through `set_api_key` is used from the next
/// call on and never by a fetch already running.
pub struct Client {
    requester: Requester,
    cache: Mutex<HashMap<CacheKey, TimeSeries>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("requester", &self.requester)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, DataError> {
        Ok(Self::with_transport(
            Arc::new(HttpTransport::new()?),
            Settings::new(config),
        ))
    }

    /// The default instance: configuration from `DATASETIQ_*` variables.
    pub fn from_env() -> Result<Self, DataError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn with_transport(transport: Arc<dyn Transport>, settings: Settings) -> Self {
        Self {
            requester: Requester::new(transport, settings),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        self.requester.settings()
    }

    pub fn set_api_key(&self, key: impl Into<String>) {
        self.settings().set_api_key(key);
    }

    /// Fetch a canonical series between inclusive `start` and `end`.
    pub fn get(
        &self,
        series_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TimeSeries, DataError> {
        self.get_with(
            series_id,
            &GetOptions {
                start,
                end,
                drop_missing: false,
            },
        )
    }

    pub fn get_with(&self, series_id: &str, opts: &GetOptions) -> Result<TimeSeries, DataError> {
        if series_id.trim().is_empty() {
            return Err(DataError::InvalidInput("series id must not be empty".into()));
        }
        if let (Some(s), Some(e)) = (opts.start, opts.end) {
            if s > e {
                return Err(DataError::InvalidInput(format!(
                    "start {s} is after end {e}"
                )));
            }
        }

        let cfg = self.settings().snapshot();
        let endpoint = if cfg.api_key.is_some() {
            Endpoint::Csv
        } else {
            Endpoint::Json
        };
        let key: CacheKey = (series_id.to_string(), endpoint, opts.start, opts.end);
        let cached = if cfg.enable_cache {
            self.cache_lock().get(&key).cloned()
        } else {
            None
        };

        let series = match cached {
            Some(series) => {
                debug!(series_id, "cache hit");
                series
            }
            None => {
                let records =
                    fetch_all(&self.requester, &cfg, endpoint, series_id, opts.start, opts.end)?;
                let series = TimeSeries::from_records(records).filter_range(opts.start, opts.end);
                if cfg.enable_cache {
                    self.cache_lock().insert(key, series.clone());
                }
                series
            }
        };

        Ok(if opts.drop_missing {
            series.drop_missing()
        } else {
            series
        })
    }

    pub fn clear_cache(&self) {
        self.cache_lock().clear();
    }

    fn cache_lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, TimeSeries>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Search the series catalogue.
    pub fn search(&self, query: &str, limit: u32, offset: u32) -> Result<SearchPage, DataError> {
        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        match self.requester.get(&["search"], &params)? {
            Payload::Json(value) => SearchPage::from_json(value),
            other => Err(DataError::ResponseFormat(format!(
                "search returned an unexpected payload: {}",
                payload_kind(&other)
            ))),
        }
    }

    /// Feature table for any accepted input shape.
    pub fn add_features(
        &self,
        input: &SeriesInput,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        opts: &FeatureOptions,
    ) -> Result<Table, DataError> {
        let (series, _) = normalize(self, input, start, end)?;
        add_features(&series, opts)
    }

    /// Insight summary for any accepted input shape.
    pub fn get_insight(
        &self,
        input: &SeriesInput,
        window: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Insight, DataError> {
        let (series, name) = normalize(self, input, start, end)?;
        Ok(summarize(&series, &name, window))
    }

    /// Aligned, imputed, feature-engineered table for several series.
    pub fn get_ml_ready(&self, series_ids: &[String], opts: &MlOptions) -> Result<Table, DataError> {
        build_ml_table(self, series_ids, opts)
    }
}

impl SeriesSource for Client {
    fn get(
        &self,
        series_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TimeSeries, DataError> {
        Client::get(self, series_id, start, end)
    }
}

fn payload_kind(payload: &Payload) -> &'static str {
    match payload {
        Payload::Page(_) => "series page",
        Payload::Pending { .. } => "status envelope",
        Payload::Json(_) => "json",
    }
}
