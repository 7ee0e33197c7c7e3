//! The `attention` command: score articles outside the current leaderboard
//! that need editorial work.

use std::collections::HashSet;

use chrono::NaiveDate;
use coretrack_core::{
    evaluate_attention, merge_sources, AppConfig, AttentionItem, Policy, ReportWindow,
    ScoredArticle, SourceKind,
};
use coretrack_db::RunType;

use crate::fail_run_best_effort;
use crate::report;
use crate::sources::{fetch_or_degrade, Fetched, Sources};

/// Candidate paths: everything analytics or search reported that is not on
/// the leaderboard.
fn candidate_paths(fetched: &Fetched, leaderboard: &HashSet<String>) -> Vec<String> {
    fetched
        .traffic_paths()
        .into_iter()
        .filter(|p| !leaderboard.contains(p))
        .collect()
}

/// Merges the fetched records and runs the priority scorer.
pub(crate) fn find_attention(
    fetched: &Fetched,
    leaderboard: &HashSet<String>,
    previous: &[ScoredArticle],
    policy: &Policy,
) -> Vec<AttentionItem> {
    let merged = merge_sources(&fetched.analytics, &fetched.search, &fetched.content);
    evaluate_attention(merged.into_values(), leaderboard, previous, &policy.attention)
}

/// Fetches a wide traffic slice, then content for the non-leaderboard paths.
async fn fetch_candidates(
    sources: &Sources,
    window: &ReportWindow,
    leaderboard: &HashSet<String>,
) -> Fetched {
    let mut fetched = Fetched::default();

    let (analytics, count) = fetch_or_degrade(sources.analytics.as_ref(), window, None).await;
    fetched.analytics = analytics;
    fetched.counts.set(SourceKind::Analytics, count);

    let (search, count) = fetch_or_degrade(sources.search_console.as_ref(), window, None).await;
    fetched.search = search;
    fetched.counts.set(SourceKind::SearchConsole, count);

    let candidates = candidate_paths(&fetched, leaderboard);
    tracing::info!(
        candidates = candidates.len(),
        leaderboard = leaderboard.len(),
        "analyzing articles outside the leaderboard"
    );
    let (content, count) =
        fetch_or_degrade(sources.content.as_ref(), window, Some(candidates.as_slice())).await;
    fetched.content = content;
    fetched.counts.set(SourceKind::Content, count);

    fetched
}

/// Runs the attention finder for `snapshot_date` over `window`.
///
/// # Errors
///
/// Returns an error if neither analytics nor search answered, the store
/// cannot be read, or the CSV cannot be written. The run row is marked failed
/// first.
pub(crate) async fn run_attention(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    policy: &Policy,
    snapshot_date: NaiveDate,
    window: ReportWindow,
    dry_run: bool,
) -> anyhow::Result<()> {
    println!("Attention finder");
    println!("Analysis date: {snapshot_date}");
    println!("Window:        {window}");
    println!();

    let leaderboard: HashSet<String> = match coretrack_db::latest_snapshot_date(pool).await? {
        Some(latest) => coretrack_db::snapshot_on(pool, latest)
            .await?
            .into_iter()
            .map(|s| s.article.page_path)
            .collect(),
        None => {
            tracing::warn!("no stored snapshot; every article is a candidate");
            HashSet::new()
        }
    };
    let previous = coretrack_db::previous_snapshot(pool, snapshot_date).await?;

    let run_id = if dry_run {
        None
    } else {
        Some(
            coretrack_db::begin_run(pool, RunType::Attention, snapshot_date, &window)
                .await?
                .id,
        )
    };

    let sources = Sources::from_config(config, policy, Some(policy.attention.row_limit));
    let fetched = fetch_candidates(&sources, &window, &leaderboard).await;
    report::print_source_counts(&fetched.counts);
    println!();

    if let Some(id) = run_id {
        if let Err(e) = coretrack_db::record_source_counts(pool, id, &fetched.counts).await {
            fail_run_best_effort(pool, id, "attention", format!("{e:#}")).await;
            return Err(e.into());
        }
    }

    if fetched.counts.analytics.is_none() && fetched.counts.search_console.is_none() {
        let message = "analytics and search console both unavailable; no candidates".to_string();
        if let Some(id) = run_id {
            fail_run_best_effort(pool, id, "attention", message.clone()).await;
        }
        anyhow::bail!("{message}");
    }

    let items = find_attention(&fetched, &leaderboard, &previous, policy);
    report::print_attention(&items, config.site_url.as_deref());
    println!();

    let Some(id) = run_id else {
        println!("dry-run: run and CSV not written");
        return Ok(());
    };

    let csv_path = report::report_path(&config.reports_dir, "attention_needed", snapshot_date);
    let mut csv_bytes = Vec::new();
    let written = report::write_attention_csv(&mut csv_bytes, &items, config.site_url.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|()| {
            report::write_report_file(&csv_path, &csv_bytes).map_err(anyhow::Error::from)
        });
    if let Err(e) = written {
        fail_run_best_effort(pool, id, "attention", format!("{e:#}")).await;
        return Err(e);
    }

    let processed = i32::try_from(items.len()).unwrap_or(i32::MAX);
    if let Err(err) = coretrack_db::complete_run(pool, id, processed, 0).await {
        fail_run_best_effort(pool, id, "attention", format!("{err:#}")).await;
        return Err(err.into());
    }

    println!("CSV report saved: {}", csv_path.display());
    Ok(())
}
