//! Priority scoring for articles outside the leaderboard that need editorial
//! work.
//!
//! Points accumulate across five areas (SEO basics, ranking opportunity,
//! traffic potential, history, readability) and the total is floored at zero.
//! Each area that contributes also records a human-readable issue and the
//! recommended action.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::metric::Metric;
use crate::policy::AttentionPolicy;
use crate::types::{ArticleRecord, ScoredArticle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttentionCategory {
    Medium,
    High,
    Critical,
}

impl fmt::Display for AttentionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttentionCategory::Medium => write!(f, "MEDIUM"),
            AttentionCategory::High => write!(f, "HIGH"),
            AttentionCategory::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttentionItem {
    pub article: ArticleRecord,
    pub priority_score: i32,
    pub category: AttentionCategory,
    pub issues: Vec<String>,
    pub actions: Vec<String>,
}

#[derive(Default)]
struct Assessment {
    score: i32,
    issues: Vec<String>,
    actions: Vec<String>,
}

impl Assessment {
    fn add(&mut self, points: i32, issue: impl Into<String>, action: impl Into<String>) {
        self.score += points;
        self.issues.push(issue.into());
        self.actions.push(action.into());
    }
}

/// Scores and ranks candidate articles, skipping any path in `leaderboard`.
///
/// `previous` is the most recent stored snapshot; an article found there was
/// in the top N last time. Items scoring above `policy.min_priority` are
/// returned, highest first (path ascending on ties), capped at
/// `policy.max_items`.
#[must_use]
pub fn evaluate_attention<I>(
    candidates: I,
    leaderboard: &HashSet<String>,
    previous: &[ScoredArticle],
    policy: &AttentionPolicy,
) -> Vec<AttentionItem>
where
    I: IntoIterator<Item = ArticleRecord>,
{
    let history: HashMap<&str, &ScoredArticle> =
        previous.iter().map(|a| (a.page_path(), a)).collect();

    let mut items: Vec<AttentionItem> = candidates
        .into_iter()
        .filter(|a| !leaderboard.contains(&a.page_path))
        .filter(|a| a.pageviews.is_known() || a.clicks.is_known())
        .filter_map(|article| {
            let prev = history.get(article.page_path.as_str()).copied();
            let assessment = assess(&article, prev);
            let score = assessment.score.max(0);
            (score > policy.min_priority).then(|| AttentionItem {
                category: categorize(score, policy),
                priority_score: score,
                issues: assessment.issues,
                actions: assessment.actions,
                article,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| a.article.page_path.cmp(&b.article.page_path))
    });
    items.truncate(policy.max_items);
    items
}

fn categorize(score: i32, policy: &AttentionPolicy) -> AttentionCategory {
    if score >= policy.critical_priority {
        AttentionCategory::Critical
    } else if score >= policy.high_priority {
        AttentionCategory::High
    } else {
        AttentionCategory::Medium
    }
}

fn assess(article: &ArticleRecord, previous: Option<&ScoredArticle>) -> Assessment {
    let mut a = Assessment::default();

    // SEO fundamentals
    if article.focus_keyword.is_unknown() {
        a.add(-20, "Missing focus keyword", "Add a focus keyword in the SEO plugin");
    } else {
        a.score += 10;
    }

    match article.days_since_update {
        Metric::Known(days) if days > 365 => a.add(
            -15,
            format!("Not updated in {days} days"),
            "Content refresh urgently needed - article over 1 year old",
        ),
        Metric::Known(days) if days > 180 => a.add(
            -10,
            format!("Not updated in {days} days"),
            "Schedule content update - approaching 6 months",
        ),
        Metric::Known(_) => a.score += 5,
        Metric::Unknown => {}
    }

    // Ranking opportunity
    if let Metric::Known(position) = article.position {
        if (4.0..=10.0).contains(&position) {
            a.add(
                40,
                format!("Position {position:.1} - near page 1 top"),
                "Quick push to top 3 positions - optimize title and add internal links",
            );
        } else if position > 10.0 && position <= 20.0 {
            a.add(
                25,
                format!("Position {position:.1} - page 2"),
                "Target page 1 - improve content depth and backlinks",
            );
        } else if position > 20.0 && position <= 30.0 {
            a.add(
                10,
                format!("Position {position:.1}"),
                "Long-term optimization - expand content and target related keywords",
            );
        }
    }

    // Traffic potential
    if let (Metric::Known(impressions), Metric::Known(ctr)) = (article.impressions, article.ctr) {
        let ctr_pct = ctr * 100.0;
        if impressions > 10_000 && ctr_pct < 2.0 {
            a.add(
                30,
                format!("{impressions} impressions but {ctr_pct:.1}% CTR"),
                "Improve title and meta description - high visibility, low clicks",
            );
        } else if impressions > 5_000 && ctr_pct < 2.0 {
            a.add(
                20,
                format!("{impressions} impressions, {ctr_pct:.1}% CTR"),
                "Optimize title for better CTR - good impressions, needs improvement",
            );
        } else if impressions > 5_000 {
            a.score += 10;
        }
    }

    if let Some(prev) = previous {
        assess_history(&mut a, article, prev);
    }

    if let Metric::Known(readability) = article.readability_score {
        if readability > 0 && readability < 60 {
            a.add(
                -5,
                format!("Low readability ({readability})"),
                "Improve readability - simplify content structure",
            );
        }
    }

    a
}

fn assess_history(a: &mut Assessment, article: &ArticleRecord, prev: &ScoredArticle) {
    a.add(
        20,
        format!("Was in top list (rank {}), now dropped", prev.rank_position),
        "Priority recovery - proven winner that declined",
    );

    if let (Metric::Known(old), Metric::Known(now)) = (prev.article.pageviews, article.pageviews) {
        if old > 0 {
            #[allow(clippy::cast_precision_loss)]
            let decline_pct = (old as f64 - now as f64) / old as f64 * 100.0;
            if decline_pct > 50.0 {
                a.add(
                    15,
                    format!("Traffic declined {decline_pct:.0}%"),
                    format!("Investigate decline - lost {decline_pct:.0}% traffic"),
                );
            } else if decline_pct > 20.0 {
                a.add(
                    10,
                    format!("Traffic declined {decline_pct:.0}%"),
                    "Monitor closely - showing traffic decline",
                );
            } else if decline_pct < -20.0 {
                a.add(
                    5,
                    format!("Traffic growing {:.0}%", decline_pct.abs()),
                    "Capitalize on growth - optimize to accelerate",
                );
            }
        }
    }

    if let (Metric::Known(old), Metric::Known(now)) = (prev.article.position, article.position) {
        let change = now - old;
        if change < -5.0 {
            a.add(
                10,
                format!("Position improving (was {old:.0})"),
                "Momentum detected - continue optimization",
            );
        } else if change > 5.0 {
            a.add(
                0,
                format!("Position declining (was {old:.0})"),
                "Stop the decline - investigate ranking drop",
            );
        }
    }
}
