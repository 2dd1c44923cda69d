//! Response decoding and status-to-error mapping.
//!
//! Success bodies come in three shapes: a JSON data envelope
//! (`data`/`nextCursor`/`hasMore`), a JSON status envelope (`status` without
//! `data`, e.g. ingestion pending), or a `date,value` CSV body. Anything else
//! that parses as JSON is passed through untouched (search results).

use super::RawResponse;
use crate::error::DataError;
use crate::series::{parse_date, Record};
use serde::Deserialize;
use serde_json::Value;

/// One page of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Decoded success body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Page(Page),
    /// Series exists but has no queryable data yet.
    Pending { status: String, message: String },
    Json(Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataEnvelope {
    data: Vec<WireRecord>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    date: String,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    status: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Option<Value>,
}

/// Turn a raw response into a payload or a typed error.
pub fn classify(raw: RawResponse) -> Result<Payload, DataError> {
    if !(200..300).contains(&raw.status) {
        return Err(error_for_status(&raw));
    }
    if is_csv(&raw) {
        let records = parse_csv(&raw.body)?;
        return Ok(Payload::Page(Page {
            records,
            next_cursor: None,
            has_more: false,
        }));
    }

    let value: Value = serde_json::from_str(&raw.body)
        .map_err(|e| DataError::ResponseFormat(format!("invalid JSON body: {e}")))?;

    if value.get("data").is_some() {
        let envelope: DataEnvelope = serde_json::from_value(value)
            .map_err(|e| DataError::ResponseFormat(format!("invalid data envelope: {e}")))?;
        let records = envelope
            .data
            .into_iter()
            .map(WireRecord::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Payload::Page(Page {
            records,
            next_cursor: envelope.next_cursor.filter(|c| !c.is_empty()),
            has_more: envelope.has_more,
        }));
    }

    if value.get("status").is_some() {
        let envelope: StatusEnvelope = serde_json::from_value(value)
            .map_err(|e| DataError::ResponseFormat(format!("invalid status envelope: {e}")))?;
        return Ok(Payload::Pending {
            status: envelope.status,
            message: envelope.message,
        });
    }

    Ok(Payload::Json(value))
}

impl WireRecord {
    fn into_record(self) -> Result<Record, DataError> {
        let date = parse_date(&self.date)
            .map_err(|_| DataError::ResponseFormat(format!("bad record date '{}'", self.date)))?;
        let value = match &self.value {
            Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
            Value::String(s) => parse_cell(s)?,
            _ => f64::NAN,
        };
        Ok(Record { date, value })
    }
}

fn is_csv(raw: &RawResponse) -> bool {
    let declared = raw
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("csv"));
    declared || raw.body.trim_start().to_ascii_lowercase().starts_with("date,")
}

/// Cell spellings read as a missing value (case-insensitive).
const MISSING_TOKENS: &[&str] = &["nan", "null", "na", "n/a", "none", "#n/a", ".", "-"];

fn parse_cell(cell: &str) -> Result<f64, DataError> {
    let cell = cell.trim();
    if cell.is_empty() || MISSING_TOKENS.iter().any(|t| cell.eq_ignore_ascii_case(t)) {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|_| DataError::ResponseFormat(format!("non-numeric value '{cell}'")))
}

/// Parse a `date,value` CSV body. Empty value cells are missing values.
pub fn parse_csv(body: &str) -> Result<Vec<Record>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DataError::ResponseFormat(format!("bad CSV header: {e}")))?
        .clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| DataError::ResponseFormat(format!("CSV body has no '{name}' column")))
    };
    let date_idx = position("date")?;
    let value_idx = position("value")?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| DataError::ResponseFormat(format!("bad CSV row: {e}")))?;
        let raw_date = row.get(date_idx).unwrap_or("").trim();
        if raw_date.is_empty() {
            continue;
        }
        let date = parse_date(raw_date)
            .map_err(|_| DataError::ResponseFormat(format!("bad CSV date '{raw_date}'")))?;
        let value = parse_cell(row.get(value_idx).unwrap_or(""))?;
        records.push(Record { date, value });
    }
    Ok(records)
}

fn error_for_status(raw: &RawResponse) -> DataError {
    let body = serde_json::from_str::<ErrorEnvelope>(&raw.body)
        .map(|env| env.error)
        .unwrap_or_else(|_| ErrorBody {
            code: String::new(),
            message: raw.body.trim().chars().take(200).collect(),
            details: None,
        });
    let message = if body.message.is_empty() {
        format!("HTTP {}", raw.status)
    } else {
        body.message
    };

    match raw.status {
        400 => DataError::Validation {
            code: or_default(body.code, "VALIDATION_ERROR"),
            message,
        },
        404 => DataError::NotFound { message },
        429 if body.code == "QUOTA_EXCEEDED" => {
            let detail = |key: &str| {
                body.details
                    .as_ref()
                    .and_then(|d| d.get(key))
                    .and_then(Value::as_u64)
            };
            DataError::QuotaExceeded {
                message,
                limit: detail("limit"),
                used: detail("used"),
            }
        }
        429 => DataError::RateLimit {
            message,
            retry_after_secs: raw.retry_after_secs,
        },
        500..=599 => DataError::Service {
            status: raw.status,
            code: or_default(body.code, "SERVICE_ERROR"),
            message,
        },
        status => DataError::Api {
            status,
            code: body.code,
            message,
            details: body.details,
        },
    }
}

fn or_default(code: String, fallback: &str) -> String {
    if code.is_empty() {
        fallback.to_string()
    } else {
        code
    }
}
