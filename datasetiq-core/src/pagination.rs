//! Cursor-following fetch of a whole series.
//!
//! Records are concatenated in arrival order. Ordering across pages is not
//! guaranteed by the service, so callers must sort (see
//! `TimeSeries::from_records`).

use crate::config::ClientConfig;
use crate::error::DataError;
use crate::series::Record;
use crate::transport::{Payload, Requester};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Which series endpoint a fetch goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Keyed CSV export, a single page.
    Csv,
    /// Anonymous JSON endpoint, cursor-paginated.
    Json,
}

impl Endpoint {
    /// Path segments under the base URL; the id is encoded as one segment.
    pub fn segments(self, series_id: &str) -> [&str; 3] {
        match self {
            Self::Csv => ["series", series_id, "csv"],
            Self::Json => ["series", series_id, "data"],
        }
    }
}

/// Fetch every record for `series_id` between `start` and `end`.
///
/// Every page is requested with the same `cfg` snapshot. A pending-ingestion
/// status on the first page yields an empty result.
pub fn fetch_all(
    requester: &Requester,
    cfg: &ClientConfig,
    endpoint: Endpoint,
    series_id: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<Record>, DataError> {
    let segments = endpoint.segments(series_id);
    let mut base_query: Vec<(&str, String)> = Vec::new();
    if let Some(s) = start {
        base_query.push(("start", s.format("%Y-%m-%d").to_string()));
    }
    if let Some(e) = end {
        base_query.push(("end", e.format("%Y-%m-%d").to_string()));
    }

    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen_cursors = HashSet::new();
    let mut pages = 0usize;

    loop {
        let mut query = base_query.clone();
        if let Some(c) = &cursor {
            query.push(("cursor", c.clone()));
        }

        let page = match requester.get_with_config(cfg, &segments, &query)? {
            Payload::Page(page) => page,
            Payload::Pending { status, message } => {
                if pages == 0 {
                    info!(series_id, status = %status, message = %message, "series not yet ingested");
                } else {
                    warn!(series_id, pages, status = %status, "pending status mid-pagination, stopping");
                }
                break;
            }
            Payload::Json(_) => {
                return Err(DataError::ResponseFormat(format!(
                    "series {series_id}: response has neither 'data' nor 'status'"
                )));
            }
        };

        pages += 1;
        debug!(series_id, page = pages, records = page.records.len(), "page received");
        records.extend(page.records);

        if !page.has_more {
            break;
        }
        let next = page.next_cursor.ok_or_else(|| {
            DataError::ResponseFormat(format!(
                "series {series_id}: hasMore is set but nextCursor is missing"
            ))
        })?;
        if !seen_cursors.insert(next.clone()) {
            return Err(DataError::ResponseFormat(format!(
                "series {series_id}: cursor '{next}' repeated"
            )));
        }
        cursor = Some(next);
    }

    info!(series_id, pages, records = records.len(), "fetch complete");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, Settings};
    use crate::series::TimeSeries;
    use crate::transport::testing::ScriptedTransport;
    use std::sync::Arc;

    fn config() -> ClientConfig {
        ClientConfig {
            base_url: "http://test/api".into(),
            base_delay_ms: 1,
            ..ClientConfig::default()
        }
    }

    fn fetch(
        transport: Arc<ScriptedTransport>,
        endpoint: Endpoint,
        series_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Record>, DataError> {
        let requester = Requester::new(transport, Settings::new(config()));
        fetch_all(&requester, &config(), endpoint, series_id, start, end)
    }

    fn page_json(dates: &[(&str, f64)], cursor: Option<&str>, has_more: bool) -> String {
        let data: Vec<String> = dates
            .iter()
            .map(|(d, v)| format!(r#"{{"date":"{d}","value":{v}}}"#))
            .collect();
        let cursor = cursor.map_or("null".to_string(), |c| format!("\"{c}\""));
        format!(
            r#"{{"data":[{}],"nextCursor":{cursor},"hasMore":{has_more}}}"#,
            data.join(",")
        )
    }

    #[test]
    fn follows_cursor_and_concatenates() {
        let transport = Arc::new(ScriptedTransport::new());
        let first: Vec<(String, f64)> = (1..=28)
            .map(|i| (format!("2020-01-{i:02}"), 100.0 + i as f64))
            .collect();
        let second: Vec<(String, f64)> = (1..=28)
            .map(|i| (format!("2020-02-{i:02}"), 200.0 + i as f64))
            .collect();
        fn as_refs(v: &[(String, f64)]) -> Vec<(&str, f64)> {
            v.iter().map(|(d, x)| (d.as_str(), *x)).collect()
        }
        transport
            .push_json(200, &page_json(&as_refs(&first), Some("page2"), true))
            .push_json(200, &page_json(&as_refs(&second), None, false));

        let records = fetch(transport.clone(), Endpoint::Json, "fred-gdp", None, None).unwrap();
        assert_eq!(records.len(), 56);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].query.iter().all(|(k, _)| k != "cursor"));
        assert!(requests[1]
            .query
            .contains(&("cursor".to_string(), "page2".to_string())));
    }

    #[test]
    fn out_of_order_pages_sort_after_normalization() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push_json(
                200,
                &page_json(&[("2020-03-01", 3.0), ("2020-04-01", 4.0)], Some("c2"), true),
            )
            .push_json(
                200,
                &page_json(&[("2020-01-01", 1.0), ("2020-02-01", 2.0)], None, false),
            );
        let records =
            fetch(transport, Endpoint::Json, "s", None, None).unwrap();
        assert_eq!(records[0].value, 3.0);

        let series = TimeSeries::from_records(records);
        assert_eq!(series.values(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn pending_first_page_is_empty() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(
            200,
            r#"{"status":"ingestion_pending","message":"Please try again in a few moments."}"#,
        );
        let records =
            fetch(transport, Endpoint::Json, "new-series", None, None).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn date_bounds_become_query_params() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, &page_json(&[], None, false));
        let start = NaiveDate::from_ymd_opt(2020, 1, 1);
        let end = NaiveDate::from_ymd_opt(2020, 12, 31);
        fetch(transport.clone(), Endpoint::Csv, "test", start, end).unwrap();

        let sent = transport.requests.lock().unwrap()[0].clone();
        assert!(sent.url.ends_with("/series/test/csv"));
        assert_eq!(
            sent.query,
            vec![
                ("start".to_string(), "2020-01-01".to_string()),
                ("end".to_string(), "2020-12-31".to_string()),
            ]
        );
    }

    #[test]
    fn series_id_is_one_encoded_segment() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, &page_json(&[], None, false));
        fetch(transport.clone(), Endpoint::Json, "odd/id?x#y", None, None).unwrap();

        let sent = transport.requests.lock().unwrap()[0].clone();
        assert_eq!(sent.url, "http://test/api/series/odd%2Fid%3Fx%23y/data");
    }

    #[test]
    fn repeated_cursor_is_an_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push_json(200, &page_json(&[("2020-01-01", 1.0)], Some("same"), true))
            .push_json(200, &page_json(&[("2020-01-02", 2.0)], Some("same"), true));
        let err = fetch(transport, Endpoint::Json, "s", None, None).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormat(_)));
    }

    #[test]
    fn has_more_without_cursor_is_an_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, &page_json(&[("2020-01-01", 1.0)], None, true));
        let err = fetch(transport, Endpoint::Json, "s", None, None).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormat(_)));
    }

    #[test]
    fn errors_propagate_from_transport() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(
            404,
            r#"{"error":{"code":"NOT_FOUND","message":"Series not found"}}"#,
        );
        let err =
            fetch(transport, Endpoint::Json, "nonexistent", None, None).unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
    }
}
