//! Search console adapter over the `searchAnalytics/query` endpoint.

use std::collections::HashSet;

use coretrack_core::{normalize_path, ReportWindow, SearchConsoleSettings, SearchMetrics, SourceKind};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;

use crate::error::SourceError;
use crate::http::{build_client, parse_base_url, post_json};
use crate::retry::retry_with_backoff;
use crate::{normalize_all, HttpOptions, MetricSource};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/";

/// Client for per-page clicks, impressions, CTR and average position.
pub struct SearchConsoleClient {
    client: Client,
    endpoint: Url,
    access_token: String,
    row_limit: u32,
    excluded_paths: HashSet<String>,
    options: HttpOptions,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    // Absent when the property has no data for the window.
    #[serde(default)]
    rows: Vec<QueryRow>,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    keys: Vec<String>,
    #[serde(default)]
    clicks: f64,
    #[serde(default)]
    impressions: f64,
    #[serde(default)]
    ctr: f64,
    #[serde(default)]
    position: f64,
}

impl SearchConsoleClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(
        settings: &SearchConsoleSettings,
        options: HttpOptions,
        excluded_paths: &[String],
    ) -> Result<Self, SourceError> {
        Self::with_base_url(settings, options, excluded_paths, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built, or
    /// [`SourceError::InvalidConfig`] for an unusable base URL.
    pub fn with_base_url(
        settings: &SearchConsoleSettings,
        options: HttpOptions,
        excluded_paths: &[String],
        base_url: &str,
    ) -> Result<Self, SourceError> {
        let site = utf8_percent_encode(&settings.site_url, NON_ALPHANUMERIC);
        let endpoint = parse_base_url(base_url)?
            .join(&format!("webmasters/v3/sites/{site}/searchAnalytics/query"))
            .map_err(|e| SourceError::InvalidConfig(format!("search console endpoint: {e}")))?;

        Ok(Self {
            client: build_client(&options)?,
            endpoint,
            access_token: settings.access_token.clone(),
            row_limit: settings.row_limit,
            excluded_paths: normalize_all(excluded_paths).into_iter().collect(),
            options,
        })
    }

    /// Overrides the configured row limit.
    #[must_use]
    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit;
        self
    }

    fn request_body(&self, window: &ReportWindow) -> serde_json::Value {
        json!({
            "startDate": window.start.to_string(),
            "endDate": window.end.to_string(),
            "dimensions": ["page"],
            "rowLimit": self.row_limit,
        })
    }

    fn parse_rows(&self, response: QueryResponse, paths: Option<&[String]>) -> Vec<SearchMetrics> {
        let wanted: Option<HashSet<&str>> =
            paths.map(|p| p.iter().map(String::as_str).collect());

        response
            .rows
            .into_iter()
            .filter_map(|row| {
                let Some(url) = row.keys.first() else {
                    tracing::warn!("skipping search console row without a page key");
                    return None;
                };
                Some(SearchMetrics {
                    page_path: normalize_path(url),
                    clicks: count(row.clicks),
                    impressions: count(row.impressions),
                    ctr: row.ctr,
                    position: row.position,
                })
            })
            .filter(|m| !self.excluded_paths.contains(&m.page_path))
            .filter(|m| wanted.as_ref().is_none_or(|w| w.contains(m.page_path.as_str())))
            .collect()
    }
}

/// Clicks and impressions arrive as JSON numbers that may be floats.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

impl MetricSource for SearchConsoleClient {
    type Record = SearchMetrics;

    const KIND: SourceKind = SourceKind::SearchConsole;

    async fn fetch(
        &self,
        window: &ReportWindow,
        paths: Option<&[String]>,
    ) -> Result<Vec<SearchMetrics>, SourceError> {
        if paths.is_some_and(<[String]>::is_empty) {
            return Ok(Vec::new());
        }
        let body = self.request_body(window);
        let value = retry_with_backoff(
            "search_console",
            self.options.max_retries,
            self.options.backoff_base_ms,
            || post_json(&self.client, &self.endpoint, &self.access_token, &body),
        )
        .await?;

        let response: QueryResponse =
            serde_json::from_value(value).map_err(|e| SourceError::Deserialize {
                context: "searchAnalytics.query".to_string(),
                source: e,
            })?;
        let records = self.parse_rows(response, paths);
        tracing::debug!(records = records.len(), %window, "search console rows fetched");
        Ok(records)
    }
}
