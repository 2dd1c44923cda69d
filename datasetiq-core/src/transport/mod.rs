//! Transport layer: one GET in, one decoded payload or typed error out.
//!
//! The `Transport` trait is the I/O seam (HTTP in production, scripted
//! responses in tests). `Requester` sits on top of it and owns URL building,
//! status classification, and retry with exponential backoff.

pub mod http;
pub mod response;

pub use http::HttpTransport;
pub use response::{classify, Page, Payload};

use crate::config::{ClientConfig, Settings};
use crate::error::DataError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A fully resolved GET request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

/// Undecoded response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// `Retry-After` header in seconds, when present.
    pub retry_after_secs: Option<u64>,
    pub body: String,
}

/// Sends a single request. Implementations do not retry.
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<RawResponse, DataError>;
}

/// Retrying request executor.
#[derive(Clone)]
pub struct Requester {
    transport: Arc<dyn Transport>,
    settings: Settings,
}

impl std::fmt::Debug for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requester")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Requester {
    pub fn new(transport: Arc<dyn Transport>, settings: Settings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// GET `{base_url}/{segments..}` with a fresh settings snapshot.
    pub fn get(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Payload, DataError> {
        self.get_with_config(&self.settings.snapshot(), segments, query)
    }

    /// GET against an explicit config snapshot and decode the body.
    ///
    /// Multi-request operations pass the same snapshot to every call so a
    /// settings update never reaches a fetch already in flight. Service
    /// errors and transient network failures are retried up to
    /// `max_retries` times; every other error returns immediately.
    pub fn get_with_config(
        &self,
        cfg: &ClientConfig,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Payload, DataError> {
        let request = Request {
            url: endpoint_url(&cfg.base_url, segments)?,
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout(),
            user_agent: cfg.user_agent.clone(),
        };

        let mut attempt = 0;
        loop {
            debug!(url = %request.url, attempt, "GET");
            let outcome = self.transport.send(&request).and_then(classify);
            match outcome {
                Err(err) if err.is_retryable() && attempt < cfg.max_retries => {
                    attempt += 1;
                    let delay = cfg.backoff_delay(attempt);
                    warn!(
                        url = %request.url,
                        attempt,
                        max_retries = cfg.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying request"
                    );
                    std::thread::sleep(delay);
                }
                other => return other,
            }
        }
    }
}

/// Append percent-encoded path segments to `base_url`.
pub fn endpoint_url(base_url: &str, segments: &[&str]) -> Result<String, DataError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| DataError::Config(format!("invalid base_url '{base_url}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| DataError::Config(format!("base_url '{base_url}' cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}
