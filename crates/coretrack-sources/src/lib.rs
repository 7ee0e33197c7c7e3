//! Metric source adapters for the core article tracker.
//!
//! Each adapter implements [`MetricSource`] and returns per-page records keyed
//! by a normalized path. Adapters fail independently; the caller decides
//! whether a failure degrades the run or aborts it.

pub mod analytics;
pub mod content;
pub mod error;
mod http;
pub(crate) mod retry;
pub mod search_console;

use std::future::Future;

use coretrack_core::{AppConfig, ReportWindow, SourceKind};

pub use analytics::AnalyticsClient;
pub use content::ContentSource;
pub use error::SourceError;
pub use search_console::SearchConsoleClient;

/// A fetcher of per-page metric records for one reporting window.
pub trait MetricSource {
    type Record: Send;

    const KIND: SourceKind;

    /// Fetches records for `window`.
    ///
    /// When `paths` is `Some`, only records for those normalized paths are
    /// returned. An empty filter yields an empty result.
    fn fetch(
        &self,
        window: &ReportWindow,
        paths: Option<&[String]>,
    ) -> impl Future<Output = Result<Vec<Self::Record>, SourceError>> + Send;
}

/// HTTP client settings shared by the API-backed adapters.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl HttpOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.http_user_agent.clone(),
            max_retries: config.http_max_retries,
            backoff_base_ms: config.http_backoff_base_ms,
        }
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "coretrack/0.1 (core-articles)".to_string(),
            max_retries: 3,
            backoff_base_ms: 1_000,
        }
    }
}

/// Normalizes excluded paths so they compare equal to adapter output.
pub(crate) fn normalize_all(paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .map(|p| coretrack_core::normalize_path(p))
        .collect()
}
