//! Analytics adapter over the GA4 Data API `runReport` endpoint.

use std::collections::HashSet;

use coretrack_core::{normalize_path, AnalyticsMetrics, AnalyticsSettings, ReportWindow, SourceKind};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;

use crate::error::SourceError;
use crate::http::{build_client, parse_base_url, post_json};
use crate::retry::retry_with_backoff;
use crate::{normalize_all, HttpOptions, MetricSource};

const DEFAULT_BASE_URL: &str = "https://analyticsdata.googleapis.com/";

/// Client for per-page pageviews, sessions and engagement time.
pub struct AnalyticsClient {
    client: Client,
    endpoint: Url,
    access_token: String,
    row_limit: u32,
    excluded_paths: HashSet<String>,
    options: HttpOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    rows: Vec<ReportRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    dimension_values: Vec<ReportValue>,
    metric_values: Vec<ReportValue>,
}

#[derive(Debug, Deserialize)]
struct ReportValue {
    value: String,
}

impl AnalyticsClient {
    /// Creates a client pointed at the production Data API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(
        settings: &AnalyticsSettings,
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
    /// [`SourceError::InvalidConfig`] for an unusable base URL or property id.
    pub fn with_base_url(
        settings: &AnalyticsSettings,
        options: HttpOptions,
        excluded_paths: &[String],
        base_url: &str,
    ) -> Result<Self, SourceError> {
        if settings.property_id.is_empty()
            || !settings.property_id.chars().all(|c| c.is_ascii_digit())
        {
            return Err(SourceError::InvalidConfig(format!(
                "analytics property id must be numeric, got '{}'",
                settings.property_id
            )));
        }
        let endpoint = parse_base_url(base_url)?
            .join(&format!("v1beta/properties/{}:runReport", settings.property_id))
            .map_err(|e| SourceError::InvalidConfig(format!("analytics endpoint: {e}")))?;

        Ok(Self {
            client: build_client(&options)?,
            endpoint,
            access_token: settings.access_token.clone(),
            row_limit: settings.row_limit,
            excluded_paths: normalize_all(excluded_paths).into_iter().collect(),
            options,
        })
    }

    /// Overrides the configured row limit (the attention finder reads a wider slice).
    #[must_use]
    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit;
        self
    }

    fn request_body(&self, window: &ReportWindow, paths: Option<&[String]>) -> serde_json::Value {
        let mut body = json!({
            "dateRanges": [{
                "startDate": window.start.to_string(),
                "endDate": window.end.to_string(),
            }],
            "dimensions": [{ "name": "pagePath" }],
            "metrics": [
                { "name": "screenPageViews" },
                { "name": "sessions" },
                { "name": "averageSessionDuration" },
            ],
            "limit": self.row_limit,
            "orderBys": [{ "metric": { "metricName": "screenPageViews" }, "desc": true }],
        });
        if let Some(paths) = paths {
            body["dimensionFilter"] = json!({
                "filter": {
                    "fieldName": "pagePath",
                    "inListFilter": { "values": raw_path_variants(paths) },
                }
            });
        }
        body
    }

    fn parse_rows(
        &self,
        response: RunReportResponse,
        paths: Option<&[String]>,
    ) -> Vec<AnalyticsMetrics> {
        let wanted: Option<HashSet<&str>> =
            paths.map(|p| p.iter().map(String::as_str).collect());

        response
            .rows
            .into_iter()
            .filter_map(|row| match parse_row(&row) {
                Ok(metrics) => Some(metrics),
                Err(reason) => {
                    tracing::warn!(reason, "skipping malformed analytics row");
                    None
                }
            })
            .filter(|m| !self.excluded_paths.contains(&m.page_path))
            .filter(|m| wanted.as_ref().is_none_or(|w| w.contains(m.page_path.as_str())))
            .collect()
    }
}

/// `pagePath` is matched raw, so each normalized path is sent with and
/// without its trailing slash.
fn raw_path_variants(paths: &[String]) -> Vec<String> {
    let mut values = Vec::with_capacity(paths.len() * 2);
    for path in paths {
        values.push(path.clone());
        if path != "/" {
            values.push(format!("{path}/"));
        }
    }
    values
}

fn parse_row(row: &ReportRow) -> Result<AnalyticsMetrics, String> {
    let raw_path = row
        .dimension_values
        .first()
        .map(|v| v.value.as_str())
        .ok_or("missing pagePath dimension")?;
    let metric = |idx: usize, name: &str| -> Result<&str, String> {
        row.metric_values
            .get(idx)
            .map(|v| v.value.as_str())
            .ok_or_else(|| format!("missing {name} metric"))
    };

    let pageviews = metric(0, "screenPageViews")?
        .parse::<u64>()
        .map_err(|e| format!("screenPageViews: {e}"))?;
    let sessions = metric(1, "sessions")?
        .parse::<u64>()
        .map_err(|e| format!("sessions: {e}"))?;
    let avg_session_duration = metric(2, "averageSessionDuration")?
        .parse::<f64>()
        .map_err(|e| format!("averageSessionDuration: {e}"))?;

    Ok(AnalyticsMetrics {
        page_path: normalize_path(raw_path),
        pageviews,
        sessions,
        avg_session_duration,
    })
}

impl MetricSource for AnalyticsClient {
    type Record = AnalyticsMetrics;

    const KIND: SourceKind = SourceKind::Analytics;

    async fn fetch(
        &self,
        window: &ReportWindow,
        paths: Option<&[String]>,
    ) -> Result<Vec<AnalyticsMetrics>, SourceError> {
        if paths.is_some_and(<[String]>::is_empty) {
            return Ok(Vec::new());
        }
        let body = self.request_body(window, paths);
        let value = retry_with_backoff(
            "analytics",
            self.options.max_retries,
            self.options.backoff_base_ms,
            || post_json(&self.client, &self.endpoint, &self.access_token, &body),
        )
        .await?;

        let response: RunReportResponse =
            serde_json::from_value(value).map_err(|e| SourceError::Deserialize {
                context: "runReport".to_string(),
                source: e,
            })?;
        let records = self.parse_rows(response, paths);
        tracing::debug!(records = records.len(), %window, "analytics rows fetched");
        Ok(records)
    }
}
