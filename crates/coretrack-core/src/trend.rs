//! Trend and alert evaluation.
//!
//! Pure function of the current leaderboard and the previous one; the store is
//! never consulted here. History-independent rules (staleness, missing focus
//! keyword and the opt-in position/readability rules) always run. Comparison
//! rules run only when a non-empty previous snapshot exists; without one they
//! are skipped, not evaluated as "no change".

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::metric::Metric;
use crate::policy::AlertThresholds;
use crate::types::{Alert, AlertKind, ScoredArticle, Severity};

#[derive(Debug, Clone)]
pub struct TrendEngine {
    thresholds: AlertThresholds,
    top_n: usize,
}

impl TrendEngine {
    #[must_use]
    pub fn new(thresholds: AlertThresholds, top_n: usize) -> Self {
        Self { thresholds, top_n }
    }

    /// Evaluates every rule for every article.
    ///
    /// Alerts come out in leaderboard order (rules in a fixed order within an
    /// article), followed by drop-outs in their previous rank order.
    #[must_use]
    pub fn evaluate(
        &self,
        snapshot_date: NaiveDate,
        current: &[ScoredArticle],
        previous: Option<&[ScoredArticle]>,
    ) -> Vec<Alert> {
        let previous = previous.filter(|p| !p.is_empty());
        let mut alerts = Vec::new();

        let previous_by_path: HashMap<&str, &ScoredArticle> = previous
            .unwrap_or_default()
            .iter()
            .map(|a| (a.page_path(), a))
            .collect();

        for article in current {
            let mut emit = |kind: AlertKind, severity: Severity, message: String, metric_value: String| {
                alerts.push(Alert {
                    snapshot_date,
                    page_path: article.page_path().to_string(),
                    kind,
                    severity,
                    message,
                    metric_value,
                });
            };

            self.content_rules(article, &mut emit);

            if previous.is_some() {
                match previous_by_path.get(article.page_path()) {
                    Some(prev) => self.comparison_rules(article, prev, &mut emit),
                    None => emit(
                        AlertKind::NewEntrant,
                        Severity::Info,
                        format!("New entrant at rank {}", article.rank_position),
                        article.rank_position.to_string(),
                    ),
                }
            }
        }

        if let Some(previous) = previous {
            let current_paths: HashSet<&str> = current.iter().map(ScoredArticle::page_path).collect();
            let mut dropped: Vec<&ScoredArticle> = previous
                .iter()
                .filter(|p| !current_paths.contains(p.page_path()))
                .collect();
            dropped.sort_by_key(|p| p.rank_position);

            for prev in dropped {
                alerts.push(Alert {
                    snapshot_date,
                    page_path: prev.page_path().to_string(),
                    kind: AlertKind::DroppedFromTop,
                    severity: Severity::Info,
                    message: format!(
                        "Dropped out of top {} (was rank {})",
                        self.top_n, prev.rank_position
                    ),
                    metric_value: prev.rank_position.to_string(),
                });
            }
        }

        alerts
    }

    fn content_rules<F>(&self, current: &ScoredArticle, emit: &mut F)
    where
        F: FnMut(AlertKind, Severity, String, String),
    {
        let t = &self.thresholds;
        let article = &current.article;

        if let Metric::Known(days) = article.days_since_update {
            if days >= t.stale_critical_days {
                emit(
                    AlertKind::ContentOutdated,
                    Severity::Critical,
                    format!("Not updated in {days} days"),
                    days.to_string(),
                );
            } else if days >= t.stale_warning_days {
                emit(
                    AlertKind::ContentOutdated,
                    Severity::Warning,
                    format!("Not updated in {days} days"),
                    days.to_string(),
                );
            }
        }

        if article.focus_keyword.is_unknown() {
            // No post id means the CMS returned no row for this path.
            let message = if article.post_id.is_unknown() {
                "Focus keyword unknown: no content metadata for this article"
            } else {
                "Article has no focus keyword set"
            };
            emit(
                AlertKind::MissingFocusKeyword,
                Severity::Warning,
                message.to_string(),
                "unknown".to_string(),
            );
        }

        if let (Some(limit), Metric::Known(position)) = (t.poor_position, article.position) {
            if position > limit {
                emit(
                    AlertKind::PoorRanking,
                    Severity::Warning,
                    format!("Average position: {position:.1}"),
                    format!("{position:.1}"),
                );
            }
        }

        if let (Some(limit), Metric::Known(score)) = (t.low_readability, article.readability_score)
        {
            if score > 0 && score < limit {
                emit(
                    AlertKind::LowReadability,
                    Severity::Info,
                    format!("Low readability score: {score}"),
                    score.to_string(),
                );
            }
        }
    }

    fn comparison_rules<F>(&self, current: &ScoredArticle, previous: &ScoredArticle, emit: &mut F)
    where
        F: FnMut(AlertKind, Severity, String, String),
    {
        let t = &self.thresholds;

        let lost = i64::from(current.rank_position) - i64::from(previous.rank_position);
        if lost >= i64::from(t.rank_drop) {
            emit(
                AlertKind::RankDeclined,
                Severity::Warning,
                format!(
                    "Rank dropped from {} to {}",
                    previous.rank_position, current.rank_position
                ),
                format!("{} -> {}", previous.rank_position, current.rank_position),
            );
        }

        if let (Metric::Known(before), Metric::Known(now)) =
            (previous.article.position, current.article.position)
        {
            let worsened = now - before;
            if worsened > t.position_decline {
                emit(
                    AlertKind::PositionDeclined,
                    Severity::Warning,
                    format!("Search position worsened by {worsened:.1}"),
                    format!("{before:.1} -> {now:.1}"),
                );
            }
        }

        if let (Metric::Known(before), Metric::Known(now)) =
            (previous.article.pageviews, current.article.pageviews)
        {
            if before > 0 {
                #[allow(clippy::cast_precision_loss)]
                let change_pct = (now as f64 - before as f64) / before as f64 * 100.0;
                if change_pct < -t.traffic_decline_pct {
                    emit(
                        AlertKind::TrafficDeclined,
                        Severity::Warning,
                        format!("Traffic down {:.1}%", change_pct.abs()),
                        format!("{change_pct:.1}%"),
                    );
                }
            }
        }
    }
}
