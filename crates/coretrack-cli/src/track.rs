//! The `track` pipeline: fetch, merge, score, rank, diff against the
//! previous snapshot, persist, and report.

use chrono::NaiveDate;
use coretrack_core::{
    merge_sources, rank_articles, Alert, AppConfig, Policy, ReportWindow, ScoredArticle, Scorer,
    TrendEngine,
};
use coretrack_db::RunType;

use crate::fail_run_best_effort;
use crate::report;
use crate::sources::{fetch_all, Fetched, Sources};

/// The in-memory result of one pipeline pass.
pub(crate) struct Leaderboard {
    pub ranked: Vec<ScoredArticle>,
    pub alerts: Vec<Alert>,
    pub has_history: bool,
}

/// Merges, scores, ranks and evaluates alerts for one fetch pass.
///
/// Pure apart from logging, so the full pipeline is testable without a
/// network or database.
pub(crate) fn build_leaderboard(
    fetched: &Fetched,
    policy: &Policy,
    snapshot_date: NaiveDate,
    previous: &[ScoredArticle],
) -> Leaderboard {
    let merged = merge_sources(&fetched.analytics, &fetched.search, &fetched.content);
    let merged_count = merged.len();

    let scorer = Scorer::new(policy.scoring.clone());
    let ranked = rank_articles(merged.into_values(), &scorer, policy.top_n);

    let engine = TrendEngine::new(policy.alerts.clone(), policy.top_n);
    let has_history = !previous.is_empty();
    let alerts = engine.evaluate(snapshot_date, &ranked, has_history.then_some(previous));

    tracing::info!(
        merged = merged_count,
        ranked = ranked.len(),
        alerts = alerts.len(),
        has_history,
        "leaderboard built"
    );

    Leaderboard {
        ranked,
        alerts,
        has_history,
    }
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Runs the core article tracker for `snapshot_date` over `window`.
///
/// Source failures degrade the run; it fails only when every source is
/// unavailable or the snapshot cannot be stored. In `dry_run` mode nothing is
/// written.
///
/// # Errors
///
/// Returns an error if all sources fail, a snapshot already exists for the
/// date, or any store or report write fails. The run row is marked failed
/// first.
pub(crate) async fn run_track(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    policy: &Policy,
    snapshot_date: NaiveDate,
    window: ReportWindow,
    dry_run: bool,
) -> anyhow::Result<()> {
    println!("Core article tracker");
    println!("Snapshot date: {snapshot_date}");
    println!("Window:        {window}");
    println!();

    let run = if dry_run {
        None
    } else {
        let run = coretrack_db::begin_run(pool, RunType::Track, snapshot_date, &window).await?;
        match coretrack_db::snapshot_exists(pool, snapshot_date).await {
            Ok(false) => {}
            Ok(true) => {
                let message = format!(
                    "a snapshot for {snapshot_date} already exists; snapshots are write-once per day"
                );
                fail_run_best_effort(pool, run.id, "track", message.clone()).await;
                anyhow::bail!("{message}");
            }
            Err(e) => {
                fail_run_best_effort(pool, run.id, "track", format!("{e:#}")).await;
                return Err(e.into());
            }
        }
        Some(run)
    };
    let run_id = run.as_ref().map(|r| r.id);

    let sources = Sources::from_config(config, policy, None);
    let fetched = fetch_all(&sources, &window).await;
    report::print_source_counts(&fetched.counts);
    println!();

    if let Some(id) = run_id {
        if let Err(e) = coretrack_db::record_source_counts(pool, id, &fetched.counts).await {
            fail_run_best_effort(pool, id, "track", format!("{e:#}")).await;
            return Err(e.into());
        }
    }

    if fetched.counts.all_unavailable() {
        let message = "all metric sources unavailable; nothing was written".to_string();
        if let Some(id) = run_id {
            fail_run_best_effort(pool, id, "track", message.clone()).await;
        }
        anyhow::bail!("{message}");
    }

    let previous = match coretrack_db::previous_snapshot(pool, snapshot_date).await {
        Ok(previous) => previous,
        Err(e) => {
            if let Some(id) = run_id {
                fail_run_best_effort(pool, id, "track", format!("{e:#}")).await;
            }
            return Err(e.into());
        }
    };

    let board = build_leaderboard(&fetched, policy, snapshot_date, &previous);

    println!("Top {} core articles:", policy.top_n);
    report::print_leaderboard(&board.ranked);
    println!();
    if !board.has_history {
        println!("no previous snapshot; trend comparison skipped");
    }
    report::print_alerts(&board.alerts);
    println!();

    let Some(id) = run_id else {
        println!("dry-run: snapshot, run and CSV not written");
        return Ok(());
    };

    let mut csv_bytes = Vec::new();
    if let Err(e) = report::write_core_csv(
        &mut csv_bytes,
        &board.ranked,
        &board.alerts,
        config.site_url.as_deref(),
    ) {
        fail_run_best_effort(pool, id, "track", format!("{e:#}")).await;
        return Err(e.into());
    }

    if let Err(e) =
        coretrack_db::persist_snapshot(pool, snapshot_date, id, &board.ranked, &board.alerts).await
    {
        fail_run_best_effort(pool, id, "track", format!("{e:#}")).await;
        return Err(e.into());
    }

    let csv_path = report::report_path(&config.reports_dir, "core_articles", snapshot_date);
    if let Err(e) = report::write_report_file(&csv_path, &csv_bytes) {
        let message = format!("snapshot stored but CSV write to {} failed: {e}", csv_path.display());
        fail_run_best_effort(pool, id, "track", message.clone()).await;
        anyhow::bail!("{message}");
    }

    if let Err(err) = coretrack_db::complete_run(
        pool,
        id,
        to_i32(board.ranked.len()),
        to_i32(board.alerts.len()),
    )
    .await
    {
        fail_run_best_effort(pool, id, "track", format!("{err:#}")).await;
        return Err(err.into());
    }

    let degraded = fetched.counts.unavailable();
    if !degraded.is_empty() {
        tracing::warn!(?degraded, "run completed with degraded sources");
    }
    println!("CSV report saved: {}", csv_path.display());
    println!(
        "stored {} articles and {} alerts for {snapshot_date}",
        board.ranked.len(),
        board.alerts.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use coretrack_core::{
        AlertKind, AnalyticsMetrics, ContentMetrics, Metric, SearchMetrics, Severity, SourceKind,
    };

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
    }

    fn analytics(path: &str, pageviews: u64) -> AnalyticsMetrics {
        AnalyticsMetrics {
            page_path: path.to_string(),
            pageviews,
            sessions: 0,
            avg_session_duration: 0.0,
        }
    }

    fn search(path: &str, position: f64) -> SearchMetrics {
        SearchMetrics {
            page_path: path.to_string(),
            clicks: 0,
            impressions: 0,
            ctr: 0.0,
            position,
        }
    }

    fn content(path: &str, days: Option<i64>) -> ContentMetrics {
        ContentMetrics {
            page_path: path.to_string(),
            post_id: 1,
            post_name: path.trim_start_matches('/').to_string(),
            post_title: path.to_string(),
            last_modified: None,
            days_since_update: days.into(),
            focus_keyword: Metric::Known("kw".to_string()),
            keyword_score: Metric::Unknown,
            readability_score: Metric::Unknown,
            is_cornerstone: false,
        }
    }

    /// analytics {/a: 1000, /b: 200}; search {/a: pos 3, /c: pos 10};
    /// content {/a: 10 days, /b: 400 days}.
    fn example_fetch() -> Fetched {
        let mut fetched = Fetched {
            analytics: vec![analytics("/a", 1000), analytics("/b", 200)],
            search: vec![search("/a", 3.0), search("/c", 10.0)],
            content: vec![content("/a", Some(10)), content("/b", Some(400))],
            ..Fetched::default()
        };
        fetched.counts.set(SourceKind::Analytics, Some(2));
        fetched.counts.set(SourceKind::SearchConsole, Some(2));
        fetched.counts.set(SourceKind::Content, Some(2));
        fetched
    }

    #[test]
    fn first_run_ranks_every_path_and_restricts_alerts() {
        let board = build_leaderboard(&example_fetch(), &Policy::default(), date(), &[]);

        let paths: Vec<&str> = board.ranked.iter().map(ScoredArticle::page_path).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
        let ranks: Vec<u32> = board.ranked.iter().map(|s| s.rank_position).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(!board.has_history);

        assert!(board
            .alerts
            .iter()
            .any(|a| a.page_path == "/b" && a.kind == AlertKind::ContentOutdated
                && a.severity == Severity::Critical));
        assert!(board.alerts.iter().all(|a| matches!(
            a.kind,
            AlertKind::ContentOutdated | AlertKind::MissingFocusKeyword
        )));
        assert!(
            board
                .alerts
                .iter()
                .any(|a| a.page_path == "/c" && a.kind == AlertKind::MissingFocusKeyword),
            "/c has no content record so its keyword is unknown"
        );
    }

    #[test]
    fn pipeline_is_deterministic() {
        let first = build_leaderboard(&example_fetch(), &Policy::default(), date(), &[]);
        let second = build_leaderboard(&example_fetch(), &Policy::default(), date(), &[]);
        assert_eq!(first.ranked, second.ranked);
        assert_eq!(first.alerts, second.alerts);
    }

    #[test]
    fn history_enables_comparison_alerts() {
        let yesterday = build_leaderboard(&example_fetch(), &Policy::default(), date(), &[]);

        let mut today = example_fetch();
        today.analytics = vec![analytics("/a", 100), analytics("/d", 5000)];
        let board = build_leaderboard(&today, &Policy::default(), date(), &yesterday.ranked);

        assert!(board.has_history);
        assert!(board
            .alerts
            .iter()
            .any(|a| a.page_path == "/d" && a.kind == AlertKind::NewEntrant));
        assert!(board
            .alerts
            .iter()
            .any(|a| a.page_path == "/a" && a.kind == AlertKind::TrafficDeclined));
    }

    #[test]
    fn top_n_caps_leaderboard() {
        let mut policy = Policy::default();
        policy.top_n = 2;
        let board = build_leaderboard(&example_fetch(), &policy, date(), &[]);
        assert_eq!(board.ranked.len(), 2);
    }
}
