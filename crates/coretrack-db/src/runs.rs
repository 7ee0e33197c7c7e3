//! Database operations for the `runs` table.
//!
//! A run is created in `running` status and moves exactly once to
//! `succeeded` or `failed`. Every transition is guarded in SQL so a closed
//! run is never mutated again.

use chrono::{DateTime, NaiveDate, Utc};
use coretrack_core::{ReportWindow, SourceCounts};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    Track,
    Attention,
}

impl RunType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunType::Track => "track",
            RunType::Attention => "attention",
        }
    }
}

/// A row from the `runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub run_type: String,
    pub status: String,
    pub snapshot_date: NaiveDate,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// `None` when the source was unavailable (or counts not yet recorded).
    pub analytics_pages: Option<i32>,
    pub search_console_pages: Option<i32>,
    pub content_pages: Option<i32>,
    pub records_processed: i32,
    pub alerts_generated: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunRow {
    /// Per-source page counts recorded for this run.
    #[must_use]
    pub fn source_counts(&self) -> SourceCounts {
        let to_count = |v: Option<i32>| v.and_then(|n| usize::try_from(n).ok());
        SourceCounts {
            analytics: to_count(self.analytics_pages),
            search_console: to_count(self.search_console_pages),
            content: to_count(self.content_pages),
        }
    }
}

const RUN_COLUMNS: &str = "id, public_id, run_type, status, snapshot_date, window_start, \
     window_end, analytics_pages, search_console_pages, content_pages, records_processed, \
     alerts_generated, error_message, started_at, completed_at";

fn clamp_count(count: Option<usize>) -> Option<i32> {
    count.map(|n| i32::try_from(n).unwrap_or(i32::MAX))
}

// ---------------------------------------------------------------------------
// Run lifecycle
// ---------------------------------------------------------------------------

/// Creates a new run in `running` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn begin_run(
    pool: &PgPool,
    run_type: RunType,
    snapshot_date: NaiveDate,
    window: &ReportWindow,
) -> Result<RunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, RunRow>(&format!(
        "INSERT INTO runs (public_id, run_type, status, snapshot_date, window_start, window_end) \
         VALUES ($1, $2, 'running', $3, $4, $5) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(run_type.as_str())
    .bind(snapshot_date)
    .bind(window.start)
    .bind(window.end)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Records how many pages each source returned. `None` marks a failed source.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is no longer
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn record_source_counts(
    pool: &PgPool,
    id: i64,
    counts: &SourceCounts,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE runs \
         SET analytics_pages = $1, search_console_pages = $2, content_pages = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(clamp_count(counts.analytics))
    .bind(clamp_count(counts.search_console))
    .bind(clamp_count(counts.content))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded`, sets `completed_at = NOW()` and the totals.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is no longer
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
    alerts_generated: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE runs \
         SET status = 'succeeded', completed_at = NOW(), \
             records_processed = $1, alerts_generated = $2 \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(records_processed)
    .bind(alerts_generated)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed`, sets `completed_at = NOW()` and `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is no longer
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_run(pool: &PgPool, id: i64) -> Result<RunRow, DbError> {
    let row = sqlx::query_as::<_, RunRow>(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_runs(pool: &PgPool, limit: i64) -> Result<Vec<RunRow>, DbError> {
    let rows = sqlx::query_as::<_, RunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM runs ORDER BY started_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
