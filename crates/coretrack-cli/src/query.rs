//! Read-only commands over the snapshot store: `snapshot show` and
//! `runs list`.

use chrono::NaiveDate;
use coretrack_db::RunRow;

use crate::report;

/// Prints the snapshot stored for `date` (or the latest one) and its alerts.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub(crate) async fn run_snapshot_show(
    pool: &sqlx::PgPool,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let date = match date {
        Some(d) => d,
        None => match coretrack_db::latest_snapshot_date(pool).await? {
            Some(d) => d,
            None => {
                println!("no snapshots stored yet; run `coretrack track` first");
                return Ok(());
            }
        },
    };

    let articles = coretrack_db::snapshot_on(pool, date).await?;
    if articles.is_empty() && !coretrack_db::snapshot_exists(pool, date).await? {
        println!("no snapshot stored for {date}");
        return Ok(());
    }
    let alerts = coretrack_db::list_alerts(pool, date).await?;

    println!("Snapshot {date}: {} articles, {} alerts", articles.len(), alerts.len());
    println!();
    report::print_leaderboard(&articles);
    println!();
    report::print_alerts(&alerts);
    Ok(())
}

fn count_cell(value: Option<i32>) -> String {
    value.map_or_else(|| "\u{2014}".to_string(), |n| n.to_string())
}

/// One table line for a recorded run.
fn format_run(run: &RunRow) -> String {
    format!(
        "{:<6}{:<11}{:<11}{:<12}{:>7}{:>7}{:>7}{:>9}{:>8}  {}",
        run.id,
        run.run_type,
        run.status,
        run.snapshot_date,
        count_cell(run.analytics_pages),
        count_cell(run.search_console_pages),
        count_cell(run.content_pages),
        run.records_processed,
        run.alerts_generated,
        run.started_at.format("%Y-%m-%d %H:%M"),
    )
}

/// Prints the `limit` most recent runs, newest first.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub(crate) async fn run_runs_list(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = coretrack_db::list_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no runs recorded");
        return Ok(());
    }

    println!(
        "{:<6}{:<11}{:<11}{:<12}{:>7}{:>7}{:>7}{:>9}{:>8}  STARTED",
        "ID", "TYPE", "STATUS", "SNAPSHOT", "GA", "GSC", "CMS", "RECORDS", "ALERTS"
    );
    for run in &runs {
        println!("{}", format_run(run));
        if let Some(message) = &run.error_message {
            println!("      error: {message}");
        }
    }
    Ok(())
}
