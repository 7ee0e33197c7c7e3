use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::metric::Metric;
use crate::path::post_name_from_path;

// ---------------------------------------------------------------------------
// Reporting window
// ---------------------------------------------------------------------------

/// Inclusive date range that every source is queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    /// Builds a window, rejecting `start > end`.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the range is inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!("window start {start} is after window end {end}"));
        }
        Ok(Self { start, end })
    }

    /// The `days`-long window that ends on `end`.
    #[must_use]
    pub fn ending(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for ReportWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Analytics,
    SearchConsole,
    Content,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Analytics,
        SourceKind::SearchConsole,
        SourceKind::Content,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Analytics => "Analytics",
            SourceKind::SearchConsole => "Search Console",
            SourceKind::Content => "Content",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Analytics => write!(f, "analytics"),
            SourceKind::SearchConsole => write!(f, "search_console"),
            SourceKind::Content => write!(f, "content"),
        }
    }
}

/// Records retrieved per source in one run. `None` marks a source that was
/// unavailable, as opposed to one that answered with zero rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub analytics: Option<usize>,
    pub search_console: Option<usize>,
    pub content: Option<usize>,
}

impl SourceCounts {
    pub fn set(&mut self, kind: SourceKind, count: Option<usize>) {
        match kind {
            SourceKind::Analytics => self.analytics = count,
            SourceKind::SearchConsole => self.search_console = count,
            SourceKind::Content => self.content = count,
        }
    }

    #[must_use]
    pub fn get(&self, kind: SourceKind) -> Option<usize> {
        match kind {
            SourceKind::Analytics => self.analytics,
            SourceKind::SearchConsole => self.search_console,
            SourceKind::Content => self.content,
        }
    }

    /// Sources that failed outright.
    #[must_use]
    pub fn unavailable(&self) -> Vec<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_none())
            .collect()
    }

    #[must_use]
    pub fn all_unavailable(&self) -> bool {
        self.unavailable().len() == SourceKind::ALL.len()
    }
}

// ---------------------------------------------------------------------------
// Per-source metric records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsMetrics {
    pub page_path: String,
    pub pageviews: u64,
    pub sessions: u64,
    /// Seconds.
    pub avg_session_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMetrics {
    pub page_path: String,
    pub clicks: u64,
    pub impressions: u64,
    /// Fraction in `[0, 1]`.
    pub ctr: f64,
    /// Average ranking position, 1 is best.
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub page_path: String,
    pub post_id: i64,
    pub post_name: String,
    pub post_title: String,
    pub last_modified: Option<NaiveDateTime>,
    pub days_since_update: Metric<i64>,
    pub focus_keyword: Metric<String>,
    pub keyword_score: Metric<i64>,
    pub readability_score: Metric<i64>,
    pub is_cornerstone: bool,
}

// ---------------------------------------------------------------------------
// Merged and scored articles
// ---------------------------------------------------------------------------

/// One article after the outer join of all sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub page_path: String,
    pub post_name: Option<String>,
    pub post_id: Metric<i64>,
    pub post_title: Metric<String>,
    pub pageviews: Metric<u64>,
    pub sessions: Metric<u64>,
    pub avg_session_duration: Metric<f64>,
    pub clicks: Metric<u64>,
    pub impressions: Metric<u64>,
    pub ctr: Metric<f64>,
    pub position: Metric<f64>,
    pub last_modified: Metric<NaiveDateTime>,
    pub days_since_update: Metric<i64>,
    pub focus_keyword: Metric<String>,
    pub keyword_score: Metric<i64>,
    pub readability_score: Metric<i64>,
    pub is_cornerstone: Metric<bool>,
}

impl ArticleRecord {
    /// An article with every metric `Unknown`.
    #[must_use]
    pub fn new(page_path: &str) -> Self {
        Self {
            page_path: page_path.to_string(),
            post_name: post_name_from_path(page_path),
            post_id: Metric::Unknown,
            post_title: Metric::Unknown,
            pageviews: Metric::Unknown,
            sessions: Metric::Unknown,
            avg_session_duration: Metric::Unknown,
            clicks: Metric::Unknown,
            impressions: Metric::Unknown,
            ctr: Metric::Unknown,
            position: Metric::Unknown,
            last_modified: Metric::Unknown,
            days_since_update: Metric::Unknown,
            focus_keyword: Metric::Unknown,
            keyword_score: Metric::Unknown,
            readability_score: Metric::Unknown,
            is_cornerstone: Metric::Unknown,
        }
    }

    pub fn apply_analytics(&mut self, m: &AnalyticsMetrics) {
        self.pageviews = Metric::Known(m.pageviews);
        self.sessions = Metric::Known(m.sessions);
        self.avg_session_duration = Metric::Known(m.avg_session_duration);
    }

    pub fn apply_search(&mut self, m: &SearchMetrics) {
        self.clicks = Metric::Known(m.clicks);
        self.impressions = Metric::Known(m.impressions);
        self.ctr = Metric::Known(m.ctr);
        self.position = Metric::Known(m.position);
    }

    pub fn apply_content(&mut self, m: &ContentMetrics) {
        self.post_name = Some(m.post_name.clone());
        self.post_id = Metric::Known(m.post_id);
        self.post_title = Metric::non_blank(Some(m.post_title.clone()));
        self.last_modified = m.last_modified.into();
        self.days_since_update = m.days_since_update;
        self.focus_keyword = m.focus_keyword.clone();
        self.keyword_score = m.keyword_score;
        self.readability_score = m.readability_score;
        self.is_cornerstone = Metric::Known(m.is_cornerstone);
    }
}

/// An article with its composite score and 1-based leaderboard position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article: ArticleRecord,
    pub composite_score: f64,
    pub rank_position: u32,
}

impl ScoredArticle {
    #[must_use]
    pub fn page_path(&self) -> &str {
        &self.article.page_path
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Alert severity, ordered `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ContentOutdated,
    MissingFocusKeyword,
    RankDeclined,
    TrafficDeclined,
    PositionDeclined,
    NewEntrant,
    DroppedFromTop,
    PoorRanking,
    LowReadability,
}

impl AlertKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::ContentOutdated => "content_outdated",
            AlertKind::MissingFocusKeyword => "missing_focus_keyword",
            AlertKind::RankDeclined => "rank_declined",
            AlertKind::TrafficDeclined => "traffic_declined",
            AlertKind::PositionDeclined => "position_declined",
            AlertKind::NewEntrant => "new_entrant",
            AlertKind::DroppedFromTop => "dropped_from_top",
            AlertKind::PoorRanking => "poor_ranking",
            AlertKind::LowReadability => "low_readability",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "content_outdated" => AlertKind::ContentOutdated,
            "missing_focus_keyword" => AlertKind::MissingFocusKeyword,
            "rank_declined" => AlertKind::RankDeclined,
            "traffic_declined" => AlertKind::TrafficDeclined,
            "position_declined" => AlertKind::PositionDeclined,
            "new_entrant" => AlertKind::NewEntrant,
            "dropped_from_top" => AlertKind::DroppedFromTop,
            "poor_ranking" => AlertKind::PoorRanking,
            "low_readability" => AlertKind::LowReadability,
            other => return Err(format!("unknown alert kind '{other}'")),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub snapshot_date: NaiveDate,
    pub page_path: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    /// The measured value that triggered the rule, formatted for display.
    pub metric_value: String,
}
