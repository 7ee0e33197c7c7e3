//! Builds the configured metric sources and fetches from them, degrading a
//! failed source to an empty record set.

use std::collections::BTreeSet;

use coretrack_core::{
    AnalyticsMetrics, AppConfig, ContentMetrics, Policy, ReportWindow, SearchMetrics,
    SourceCounts, SourceKind,
};
use coretrack_sources::{
    AnalyticsClient, ContentSource, HttpOptions, MetricSource, SearchConsoleClient,
};

/// The sources that could be constructed from the current configuration.
/// A `None` source is reported as unavailable for the run.
pub(crate) struct Sources {
    pub analytics: Option<AnalyticsClient>,
    pub search_console: Option<SearchConsoleClient>,
    pub content: Option<ContentSource>,
}

impl Sources {
    /// Builds every source that has credentials configured.
    ///
    /// `row_limit` overrides the configured analytics and search row limits.
    pub(crate) fn from_config(config: &AppConfig, policy: &Policy, row_limit: Option<u32>) -> Self {
        let options = HttpOptions::from_app_config(config);

        let analytics = config.analytics.as_ref().and_then(|settings| {
            AnalyticsClient::new(settings, options.clone(), &policy.excluded_paths)
                .map(|c| match row_limit {
                    Some(limit) => c.with_row_limit(limit),
                    None => c,
                })
                .map_err(|e| tracing::warn!(source = %SourceKind::Analytics, error = %e, "source disabled"))
                .ok()
        });
        let search_console = config.search_console.as_ref().and_then(|settings| {
            SearchConsoleClient::new(settings, options.clone(), &policy.excluded_paths)
                .map(|c| match row_limit {
                    Some(limit) => c.with_row_limit(limit),
                    None => c,
                })
                .map_err(|e| tracing::warn!(source = %SourceKind::SearchConsole, error = %e, "source disabled"))
                .ok()
        });
        let content = config.content.as_ref().and_then(|settings| {
            ContentSource::connect(settings, config.db_acquire_timeout_secs)
                .map_err(|e| tracing::warn!(source = %SourceKind::Content, error = %e, "source disabled"))
                .ok()
        });

        for (kind, configured) in [
            (SourceKind::Analytics, config.analytics.is_some()),
            (SourceKind::SearchConsole, config.search_console.is_some()),
            (SourceKind::Content, config.content.is_some()),
        ] {
            if !configured {
                tracing::warn!(source = %kind, "source not configured; treating as unavailable");
            }
        }

        Self {
            analytics,
            search_console,
            content,
        }
    }
}

/// Records from one fetch pass plus per-source counts.
#[derive(Debug, Default)]
pub(crate) struct Fetched {
    pub analytics: Vec<AnalyticsMetrics>,
    pub search: Vec<SearchMetrics>,
    pub content: Vec<ContentMetrics>,
    pub counts: SourceCounts,
}

impl Fetched {
    /// Distinct paths reported by analytics or search, in path order.
    pub(crate) fn traffic_paths(&self) -> Vec<String> {
        self.analytics
            .iter()
            .map(|m| m.page_path.clone())
            .chain(self.search.iter().map(|m| m.page_path.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Fetches from `source`, turning any failure into `None` with a warning.
///
/// The returned count is `None` only when the source was unavailable.
pub(crate) async fn fetch_or_degrade<S: MetricSource>(
    source: Option<&S>,
    window: &ReportWindow,
    paths: Option<&[String]>,
) -> (Vec<S::Record>, Option<usize>) {
    let Some(source) = source else {
        return (Vec::new(), None);
    };
    match source.fetch(window, paths).await {
        Ok(records) => {
            let count = records.len();
            tracing::info!(source = %S::KIND, count, "fetched source records");
            (records, Some(count))
        }
        Err(e) => {
            tracing::warn!(
                source = %S::KIND,
                error = %e,
                "source unavailable; continuing with its metrics unknown"
            );
            (Vec::new(), None)
        }
    }
}

/// Fetches analytics and search first, then content for the paths they
/// reported (or every published post when neither answered).
pub(crate) async fn fetch_all(sources: &Sources, window: &ReportWindow) -> Fetched {
    let mut fetched = Fetched::default();

    let (analytics, count) = fetch_or_degrade(sources.analytics.as_ref(), window, None).await;
    fetched.analytics = analytics;
    fetched.counts.set(SourceKind::Analytics, count);

    let (search, count) = fetch_or_degrade(sources.search_console.as_ref(), window, None).await;
    fetched.search = search;
    fetched.counts.set(SourceKind::SearchConsole, count);

    let traffic_answered =
        fetched.counts.analytics.is_some() || fetched.counts.search_console.is_some();
    let paths = fetched.traffic_paths();
    let filter = traffic_answered.then_some(paths.as_slice());

    let (content, count) = fetch_or_degrade(sources.content.as_ref(), window, filter).await;
    fetched.content = content;
    fetched.counts.set(SourceKind::Content, count);

    fetched
}
