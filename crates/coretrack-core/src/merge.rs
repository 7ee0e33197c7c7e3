//! Full outer join of the three per-source record sets.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::path::normalize_path;
use crate::types::{AnalyticsMetrics, ArticleRecord, ContentMetrics, SearchMetrics};

/// Joins per-source records by normalized page path.
///
/// Every path seen in any input produces exactly one [`ArticleRecord`]; metrics
/// a source did not report stay `Unknown`. Rows from one source that collapse
/// onto the same path after normalization are folded together first (see
/// [`fold_analytics`] and [`fold_search`]). The map is ordered by path so
/// downstream iteration is deterministic.
#[must_use]
pub fn merge_sources(
    analytics: &[AnalyticsMetrics],
    search: &[SearchMetrics],
    content: &[ContentMetrics],
) -> BTreeMap<String, ArticleRecord> {
    let mut merged: BTreeMap<String, ArticleRecord> = BTreeMap::new();

    for m in fold_analytics(analytics).values() {
        entry_for(&mut merged, &m.page_path).apply_analytics(m);
    }

    for m in fold_search(search).values() {
        entry_for(&mut merged, &m.page_path).apply_search(m);
    }

    let mut seen_content: BTreeMap<String, i64> = BTreeMap::new();
    for m in content {
        let path = normalize_path(&m.page_path);
        match seen_content.entry(path.clone()) {
            Entry::Occupied(first) => {
                tracing::warn!(
                    page_path = %path,
                    kept_post_id = *first.get(),
                    dropped_post_id = m.post_id,
                    "duplicate content record for path; keeping the first"
                );
                continue;
            }
            Entry::Vacant(slot) => {
                slot.insert(m.post_id);
            }
        }
        entry_for(&mut merged, &path).apply_content(m);
    }

    merged
}

fn entry_for<'a>(
    merged: &'a mut BTreeMap<String, ArticleRecord>,
    path: &str,
) -> &'a mut ArticleRecord {
    merged
        .entry(path.to_string())
        .or_insert_with(|| ArticleRecord::new(path))
}

/// Folds analytics rows that share a normalized path: counts are summed and
/// average session duration is session-weighted.
#[must_use]
pub fn fold_analytics(rows: &[AnalyticsMetrics]) -> BTreeMap<String, AnalyticsMetrics> {
    let mut folded: BTreeMap<String, AnalyticsMetrics> = BTreeMap::new();

    for row in rows {
        let path = normalize_path(&row.page_path);
        match folded.entry(path.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(AnalyticsMetrics {
                    page_path: path,
                    ..row.clone()
                });
            }
            Entry::Occupied(mut slot) => {
                let acc = slot.get_mut();
                let total_sessions = acc.sessions.saturating_add(row.sessions);
                acc.avg_session_duration = if total_sessions == 0 {
                    acc.avg_session_duration.max(row.avg_session_duration)
                } else {
                    weighted_mean(
                        acc.avg_session_duration,
                        acc.sessions,
                        row.avg_session_duration,
                        row.sessions,
                    )
                };
                acc.pageviews = acc.pageviews.saturating_add(row.pageviews);
                acc.sessions = total_sessions;
            }
        }
    }

    folded
}

/// Folds search rows that share a normalized path: clicks and impressions are
/// summed, position is impression-weighted and ctr recomputed.
#[must_use]
pub fn fold_search(rows: &[SearchMetrics]) -> BTreeMap<String, SearchMetrics> {
    let mut folded: BTreeMap<String, SearchMetrics> = BTreeMap::new();

    for row in rows {
        let path = normalize_path(&row.page_path);
        match folded.entry(path.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(SearchMetrics {
                    page_path: path,
                    ..row.clone()
                });
            }
            Entry::Occupied(mut slot) => {
                let acc = slot.get_mut();
                let total_impressions = acc.impressions.saturating_add(row.impressions);
                acc.position = if total_impressions == 0 {
                    acc.position.min(row.position)
                } else {
                    weighted_mean(acc.position, acc.impressions, row.position, row.impressions)
                };
                acc.clicks = acc.clicks.saturating_add(row.clicks);
                acc.impressions = total_impressions;
                acc.ctr = ratio(acc.clicks, total_impressions);
            }
        }
    }

    folded
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

#[allow(clippy::cast_precision_loss)]
fn weighted_mean(a: f64, a_weight: u64, b: f64, b_weight: u64) -> f64 {
    let total = a_weight.saturating_add(b_weight) as f64;
    (a * a_weight as f64 + b * b_weight as f64) / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;

    fn ga(path: &str, views: u64, sessions: u64) -> AnalyticsMetrics {
        AnalyticsMetrics {
            page_path: path.to_string(),
            pageviews: views,
            sessions,
            avg_session_duration: 60.0,
        }
    }

    fn sc(path: &str, clicks: u64, impressions: u64, position: f64) -> SearchMetrics {
        SearchMetrics {
            page_path: path.to_string(),
            clicks,
            impressions,
            ctr: 0.0,
            position,
        }
    }

    fn wp(path: &str, post_id: i64, days: Option<i64>) -> ContentMetrics {
        ContentMetrics {
            page_path: path.to_string(),
            post_id,
            post_name: path.trim_matches('/').to_string(),
            post_title: format!("Post {post_id}"),
            last_modified: None,
            days_since_update: days.into(),
            focus_keyword: Metric::Known("kw".to_string()),
            keyword_score: Metric::Known(80),
            readability_score: Metric::Known(70),
            is_cornerstone: false,
        }
    }

    #[test]
    fn every_path_from_any_source_is_present() {
        let merged = merge_sources(
            &[ga("/a", 1000, 10), ga("/b", 200, 5)],
            &[sc("/a", 10, 100, 3.0), sc("/c", 4, 50, 10.0)],
            &[wp("/a", 1, Some(10)), wp("/b", 2, Some(400)), wp("/d", 4, None)],
        );

        let paths: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c", "/d"]);
    }

    #[test]
    fn missing_source_leaves_metrics_unknown() {
        let merged = merge_sources(&[ga("/b", 200, 5)], &[sc("/c", 4, 50, 10.0)], &[]);

        let b = &merged["/b"];
        assert_eq!(b.pageviews, Metric::Known(200));
        assert!(b.clicks.is_unknown());
        assert!(b.position.is_unknown());
        assert!(b.focus_keyword.is_unknown());
        assert!(b.days_since_update.is_unknown());

        let c = &merged["/c"];
        assert!(c.pageviews.is_unknown());
        assert_eq!(c.position, Metric::Known(10.0));
    }

    #[test]
    fn empty_source_does_not_drop_paths_from_others() {
        let merged = merge_sources(&[], &[sc("/x", 1, 10, 2.0)], &[wp("/y", 9, Some(1))]);
        assert_eq!(merged.len(), 2);
        assert!(merged.contains_key("/x"));
        assert!(merged.contains_key("/y"));
    }

    #[test]
    fn paths_are_normalized_before_joining() {
        let merged = merge_sources(
            &[ga("/a/", 10, 1)],
            &[sc("https://example.org/a", 3, 30, 4.0)],
            &[wp("/a", 7, Some(5))],
        );
        assert_eq!(merged.len(), 1);
        let a = &merged["/a"];
        assert_eq!(a.pageviews, Metric::Known(10));
        assert_eq!(a.clicks, Metric::Known(3));
        assert_eq!(a.post_id, Metric::Known(7));
    }

    #[test]
    fn duplicate_analytics_rows_are_summed() {
        let mut first = ga("/a", 100, 10);
        first.avg_session_duration = 30.0;
        let mut second = ga("/a/", 50, 30);
        second.avg_session_duration = 70.0;

        let folded = fold_analytics(&[first, second]);
        let a = &folded["/a"];
        assert_eq!(a.pageviews, 150);
        assert_eq!(a.sessions, 40);
        assert!((a.avg_session_duration - 60.0).abs() < 1e-9);
    }

    #[test]
    fn huge_duplicate_counts_saturate_instead_of_overflowing() {
        let rows = vec![ga("/a", u64::MAX, u64::MAX), ga("/a/", 5, 5)];
        let folded = fold_analytics(&rows);
        let a = &folded["/a"];
        assert_eq!(a.sessions, u64::MAX);
        assert_eq!(a.pageviews, u64::MAX);
        assert!((a.avg_session_duration - 60.0).abs() < 1e-6);
    }

    #[test]
    fn duplicate_search_rows_weight_position_by_impressions() {
        let folded = fold_search(&[sc("/a", 10, 300, 2.0), sc("/a/", 10, 100, 6.0)]);
        let a = &folded["/a"];
        assert_eq!(a.clicks, 20);
        assert_eq!(a.impressions, 400);
        assert!((a.position - 3.0).abs() < 1e-9);
        assert!((a.ctr - 0.05).abs() < 1e-9);
    }

    #[test]
    fn duplicate_content_rows_keep_first() {
        let merged = merge_sources(&[], &[], &[wp("/a", 1, Some(3)), wp("/a/", 2, Some(9))]);
        assert_eq!(merged["/a"].post_id, Metric::Known(1));
        assert_eq!(merged["/a"].days_since_update, Metric::Known(3));
    }
}
