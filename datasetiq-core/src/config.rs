//! Client configuration.
//!
//! `ClientConfig` is plain data (deserializable from TOML, overridable from
//! `DATASETIQ_*` environment variables). `Settings` is the shared handle the
//! transport reads from: each request takes a snapshot, so updates apply to
//! the next call and never to one already in flight.

use crate::error::DataError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.datasetiq.com/api/public";

/// Serializable client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API key. Without one the anonymous JSON endpoint is used.
    pub api_key: Option<String>,

    /// Base URL of the public API, without a trailing slash.
    pub base_url: String,

    /// Retries after the first attempt for 5xx and transient network errors.
    pub max_retries: u32,

    /// Memoize fetched series in memory.
    pub enable_cache: bool,

    /// Per-request timeout.
    pub timeout_secs: u64,

    /// First backoff delay; doubles with each retry.
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay.
    pub max_delay_ms: u64,

    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 3,
            enable_cache: false,
            timeout_secs: 30,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            user_agent: format!("datasetiq-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `DATASETIQ_*` environment variables.
    pub fn from_env() -> Result<Self, DataError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| DataError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply overrides from an arbitrary key lookup (the environment in production).
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, DataError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(key) = lookup("DATASETIQ_API_KEY").filter(|k| !k.trim().is_empty()) {
            config.api_key = Some(key);
        }
        if let Some(url) = lookup("DATASETIQ_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("DATASETIQ_MAX_RETRIES") {
            config.max_retries = raw.trim().parse().map_err(|_| {
                DataError::Config(format!("DATASETIQ_MAX_RETRIES must be an integer, got '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup("DATASETIQ_ENABLE_CACHE") {
            config.enable_cache = parse_flag(&raw).ok_or_else(|| {
                DataError::Config(format!("DATASETIQ_ENABLE_CACHE must be a boolean, got '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup("DATASETIQ_TIMEOUT_SECS") {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                DataError::Config(format!("DATASETIQ_TIMEOUT_SECS must be an integer, got '{raw}'"))
            })?;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff before retry number `attempt` (1-based), capped at `max_delay_ms`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(20);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Shared, explicitly owned configuration handle.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    inner: Arc<RwLock<ClientConfig>>,
}

impl Settings {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Copy of the current configuration.
    pub fn snapshot(&self) -> ClientConfig {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Mutate the configuration; takes effect on the next call.
    pub fn update(&self, f: impl FnOnce(&mut ClientConfig)) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut *guard);
    }

    pub fn set_api_key(&self, key: impl Into<String>) {
        let key = key.into();
        self.update(|cfg| cfg.api_key = Some(key));
    }
}
