//! Blocking HTTP transport over `reqwest`.

use super::{RawResponse, Request, Transport};
use crate::error::DataError;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER, USER_AGENT};

/// Production transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| DataError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<RawResponse, DataError> {
        let mut builder = self
            .client
            .get(&request.url)
            .query(&request.query)
            .timeout(request.timeout)
            .header(USER_AGENT, request.user_agent.as_str());
        if let Some(key) = &request.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().map_err(network_error)?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let retry_after_secs = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = resp.text().map_err(network_error)?;

        Ok(RawResponse {
            status,
            content_type,
            retry_after_secs,
            body,
        })
    }
}

fn network_error(e: reqwest::Error) -> DataError {
    DataError::Network {
        transient: e.is_connect() || e.is_timeout(),
        message: e.to_string(),
    }
}
