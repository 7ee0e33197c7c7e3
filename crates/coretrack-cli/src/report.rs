//! Console and CSV rendering for `track` and `attention`.

use std::collections::HashMap;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use coretrack_core::{
    Alert, AttentionCategory, AttentionItem, Metric, ScoredArticle, Severity, SourceCounts,
    SourceKind,
};

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Renders a metric for a table cell; unknown values print as `—`.
fn cell<T: Display>(value: &Metric<T>) -> String {
    match value {
        Metric::Known(v) => v.to_string(),
        Metric::Unknown => "\u{2014}".to_string(),
    }
}

/// Renders a metric for CSV; unknown values are left empty.
fn csv_cell<T: Display>(value: &Metric<T>) -> String {
    match value {
        Metric::Known(v) => v.to_string(),
        Metric::Unknown => String::new(),
    }
}

fn csv_fixed(value: Metric<f64>, decimals: usize) -> String {
    value
        .known()
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_default()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

fn full_url(site_url: Option<&str>, page_path: &str) -> String {
    site_url.map_or_else(String::new, |site| {
        format!("{}{page_path}", site.trim_end_matches('/'))
    })
}

/// Report file path for `prefix` on `date` inside `dir`.
pub(crate) fn report_path(dir: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{prefix}_{date}.csv"))
}

/// Writes `bytes` to `path`, creating the parent directory first.
pub(crate) fn write_report_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

// ---------------------------------------------------------------------------
// Core article report
// ---------------------------------------------------------------------------

/// Prints how many records each source returned, flagging unavailable ones.
pub(crate) fn print_source_counts(counts: &SourceCounts) {
    println!("Sources:");
    for kind in SourceKind::ALL {
        match counts.get(kind) {
            Some(n) => println!("  {:<16}{n} pages", kind.label()),
            None => println!("  {:<16}UNAVAILABLE", kind.label()),
        }
    }
}

/// Prints the ranked leaderboard as a fixed-width table.
pub(crate) fn print_leaderboard(articles: &[ScoredArticle]) {
    if articles.is_empty() {
        println!("no articles ranked");
        return;
    }
    println!(
        "{:<6}{:<52}{:>10}{:>10}{:>9}{:>7}{:>7}  KEYWORD",
        "RANK", "PAGE", "SCORE", "VIEWS", "CLICKS", "POS", "DAYS"
    );
    for scored in articles {
        let a = &scored.article;
        let position = a
            .position
            .known()
            .map_or_else(|| "\u{2014}".to_string(), |p| format!("{p:.1}"));
        println!(
            "{:<6}{:<52}{:>10.2}{:>10}{:>9}{:>7}{:>7}  {}",
            scored.rank_position,
            truncate(&scored.article.page_path, 48),
            scored.composite_score,
            cell(&a.pageviews),
            cell(&a.clicks),
            position,
            cell(&a.days_since_update),
            a.focus_keyword.as_ref().known().map_or("MISSING", String::as_str),
        );
    }
}

/// Prints alerts grouped by severity, most severe first.
pub(crate) fn print_alerts(alerts: &[Alert]) {
    if alerts.is_empty() {
        println!("no alerts");
        return;
    }
    println!("Alerts ({} total):", alerts.len());
    for severity in [Severity::Critical, Severity::Warning, Severity::Info] {
        let group: Vec<&Alert> = alerts.iter().filter(|a| a.severity == severity).collect();
        if group.is_empty() {
            continue;
        }
        println!("  {} ({}):", severity.as_str().to_uppercase(), group.len());
        for alert in group {
            println!("    - {}: {}", truncate(&alert.page_path, 60), alert.message);
        }
    }
}

const CORE_HEADERS: [&str; 22] = [
    "rank_position",
    "page_path",
    "url",
    "post_id",
    "post_name",
    "post_title",
    "composite_score",
    "pageviews",
    "sessions",
    "avg_session_duration",
    "clicks",
    "impressions",
    "ctr",
    "avg_position",
    "last_modified",
    "days_since_update",
    "focus_keyword",
    "keyword_score",
    "readability_score",
    "is_cornerstone",
    "alert_count",
    "alerts",
];

/// Writes one CSV row per ranked article with its alert messages joined by `"; "`.
///
/// # Errors
///
/// Returns [`csv::Error`] if writing to `writer` fails.
pub(crate) fn write_core_csv<W: Write>(
    writer: W,
    articles: &[ScoredArticle],
    alerts: &[Alert],
    site_url: Option<&str>,
) -> Result<(), csv::Error> {
    let mut by_path: HashMap<&str, Vec<&str>> = HashMap::new();
    for alert in alerts {
        by_path
            .entry(alert.page_path.as_str())
            .or_default()
            .push(alert.message.as_str());
    }

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(CORE_HEADERS)?;
    for scored in articles {
        let a = &scored.article;
        let messages = by_path.get(a.page_path.as_str()).cloned().unwrap_or_default();
        out.write_record([
            scored.rank_position.to_string(),
            a.page_path.clone(),
            full_url(site_url, &a.page_path),
            csv_cell(&a.post_id),
            a.post_name.clone().unwrap_or_default(),
            csv_cell(&a.post_title),
            format!("{:.2}", scored.composite_score),
            csv_cell(&a.pageviews),
            csv_cell(&a.sessions),
            csv_fixed(a.avg_session_duration, 1),
            csv_cell(&a.clicks),
            csv_cell(&a.impressions),
            csv_fixed(a.ctr, 4),
            csv_fixed(a.position, 2),
            csv_cell(&a.last_modified),
            csv_cell(&a.days_since_update),
            csv_cell(&a.focus_keyword),
            csv_cell(&a.keyword_score),
            csv_cell(&a.readability_score),
            csv_cell(&a.is_cornerstone),
            messages.len().to_string(),
            messages.join("; "),
        ])?;
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Attention report
// ---------------------------------------------------------------------------

/// Prints category totals, critical items in detail and a table of high ones.
pub(crate) fn print_attention(items: &[AttentionItem], site_url: Option<&str>) {
    if items.is_empty() {
        println!("no articles need urgent attention");
        return;
    }
    let count = |c: AttentionCategory| items.iter().filter(|i| i.category == c).count();
    println!("Articles needing attention: {}", items.len());
    println!("  CRITICAL: {}", count(AttentionCategory::Critical));
    println!("  HIGH:     {}", count(AttentionCategory::High));
    println!("  MEDIUM:   {}", count(AttentionCategory::Medium));

    let critical = items
        .iter()
        .filter(|i| i.category == AttentionCategory::Critical);
    for (n, item) in critical.enumerate() {
        let a = &item.article;
        println!();
        println!(
            "{}. [{}] {} {}",
            n + 1,
            item.priority_score,
            a.page_path,
            truncate(a.post_title.as_ref().known().map_or("", String::as_str), 60)
        );
        let url = full_url(site_url, &a.page_path);
        if !url.is_empty() {
            println!("   URL: {url}");
        }
        println!("   Issues: {}", item.issues.join("; "));
        for action in &item.actions {
            println!("     -> {action}");
        }
    }

    let high: Vec<&AttentionItem> = items
        .iter()
        .filter(|i| i.category == AttentionCategory::High)
        .collect();
    if !high.is_empty() {
        println!();
        println!(
            "{:<7}{:<48}{:>9}{:>9}{:>7}{:>7}",
            "SCORE", "PAGE", "VIEWS", "CLICKS", "POS", "DAYS"
        );
        for item in high.iter().take(10) {
            let a = &item.article;
            let position = a
                .position
                .known()
                .map_or_else(|| "\u{2014}".to_string(), |p| format!("{p:.1}"));
            println!(
                "{:<7}{:<48}{:>9}{:>9}{:>7}{:>7}",
                item.priority_score,
                truncate(&a.page_path, 44),
                cell(&a.pageviews),
                cell(&a.clicks),
                position,
                cell(&a.days_since_update),
            );
        }
        if high.len() > 10 {
            println!("   ... and {} more (see CSV)", high.len() - 10);
        }
    }
}

const ATTENTION_HEADERS: [&str; 15] = [
    "priority_score",
    "category",
    "post_id",
    "post_title",
    "url",
    "pageviews",
    "clicks",
    "impressions",
    "ctr_pct",
    "avg_position",
    "days_since_update",
    "focus_keyword",
    "readability_score",
    "issues",
    "recommended_actions",
];

/// Writes one CSV row per attention item.
///
/// # Errors
///
/// Returns [`csv::Error`] if writing to `writer` fails.
pub(crate) fn write_attention_csv<W: Write>(
    writer: W,
    items: &[AttentionItem],
    site_url: Option<&str>,
) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(ATTENTION_HEADERS)?;
    for item in items {
        let a = &item.article;
        let url = match full_url(site_url, &a.page_path) {
            u if u.is_empty() => a.page_path.clone(),
            u => u,
        };
        out.write_record([
            item.priority_score.to_string(),
            item.category.to_string(),
            csv_cell(&a.post_id),
            csv_cell(&a.post_title),
            url,
            csv_cell(&a.pageviews),
            csv_cell(&a.clicks),
            csv_cell(&a.impressions),
            csv_fixed(a.ctr.map(|c| c * 100.0), 2),
            csv_fixed(a.position, 1),
            csv_cell(&a.days_since_update),
            a.focus_keyword
                .as_ref()
                .known()
                .map_or_else(|| "MISSING".to_string(), Clone::clone),
            csv_cell(&a.readability_score),
            item.issues.join("; "),
            item.actions.join(" | "),
        ])?;
    }
    out.flush()?;
    Ok(())
}
