//! Series search results.

use crate::error::DataError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 10;

/// Catalogue metadata for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// One page of search results. `count` is the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl SearchPage {
    pub fn from_json(value: serde_json::Value) -> Result<Self, DataError> {
        serde_json::from_value(value)
            .map_err(|e| DataError::ResponseFormat(format!("search response: {e}")))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// One row per result, one string column per metadata field.
    pub fn to_dataframe(&self) -> Result<DataFrame, DataError> {
        let text = |f: fn(&SearchResult) -> String| -> Vec<String> {
            self.results.iter().map(f).collect()
        };
        let optional = |f: fn(&SearchResult) -> Option<String>| -> Vec<Option<String>> {
            self.results.iter().map(f).collect()
        };
        let df = DataFrame::new(vec![
            Column::new("id".into(), text(|r| r.id.clone())),
            Column::new("slug".into(), text(|r| r.slug.clone())),
            Column::new("title".into(), text(|r| r.title.clone())),
            Column::new("description".into(), optional(|r| r.description.clone())),
            Column::new("provider".into(), optional(|r| r.provider.clone())),
            Column::new("frequency".into(), optional(|r| r.frequency.clone())),
            Column::new("start_date".into(), optional(|r| r.start_date.clone())),
            Column::new("end_date".into(), optional(|r| r.end_date.clone())),
            Column::new("last_updated".into(), optional(|r| r.last_updated.clone())),
        ])?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_and_sparse_results() {
        let page = SearchPage::from_json(json!({
            "results": [
                {
                    "id": "fred-gdp",
                    "slug": "fred-gdp",
                    "title": "GDP",
                    "description": "Gross Domestic Product",
                    "provider": "FRED",
                    "frequency": "Quarterly",
                    "startDate": "1947-01-01",
                    "endDate": "2023-12-01",
                    "lastUpdated": "2024-01-15"
                },
                {"id": "series-1", "slug": "series-1", "title": "Series 1"}
            ],
            "count": 100,
            "limit": 10,
            "offset": 0
        }))
        .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.count, 100);
        assert_eq!(page.results[0].start_date.as_deref(), Some("1947-01-01"));
        assert_eq!(page.results[1].provider, None);
    }

    #[test]
    fn frame_has_one_row_per_result() {
        let page = SearchPage::from_json(json!({
            "results": [
                {"id": "a", "slug": "a", "title": "A", "provider": "BLS"},
                {"id": "b", "slug": "b", "title": "B"}
            ],
            "count": 2
        }))
        .unwrap();
        let df = page.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 9);
        let ids: Vec<Option<&str>> = df.column("id").unwrap().str().unwrap().iter().collect();
        assert_eq!(ids, vec![Some("a"), Some("b")]);
        assert_eq!(df.column("provider").unwrap().null_count(), 1);
    }

    #[test]
    fn missing_results_is_an_empty_page() {
        let page = SearchPage::from_json(json!({"count": 0})).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn result_without_id_is_a_format_error() {
        let err = SearchPage::from_json(json!({"results": [{"title": "x"}]})).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormat(_)));
    }
}
