//! Database operations for `core_article_snapshots`.
//!
//! A snapshot is the ranked top-N list for one calendar day. Snapshots are
//! write-once: a second write for the same date is rejected with
//! [`DbError::SnapshotExists`] and nothing from it is kept.

use chrono::{NaiveDate, NaiveDateTime};
use coretrack_core::{Alert, ArticleRecord, Metric, ScoredArticle};
use sqlx::{PgConnection, PgPool};

use crate::alerts::insert_alerts;
use crate::{is_unique_violation, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `core_article_snapshots` table. NULL metric columns mean
/// the metric was unknown when the snapshot was taken.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub snapshot_date: NaiveDate,
    pub run_id: i64,
    pub page_path: String,
    pub post_name: Option<String>,
    pub post_id: Option<i64>,
    pub post_title: Option<String>,
    pub pageviews: Option<i64>,
    pub sessions: Option<i64>,
    pub avg_session_duration: Option<f64>,
    pub clicks: Option<i64>,
    pub impressions: Option<i64>,
    pub ctr: Option<f64>,
    pub avg_position: Option<f64>,
    pub last_modified: Option<NaiveDateTime>,
    pub days_since_update: Option<i64>,
    pub focus_keyword: Option<String>,
    pub keyword_score: Option<i64>,
    pub readability_score: Option<i64>,
    pub is_cornerstone: Option<bool>,
    pub composite_score: f64,
    pub rank_position: i32,
}

fn to_db_count(value: Metric<u64>) -> Option<i64> {
    value.known().map(|n| i64::try_from(n).unwrap_or(i64::MAX))
}

fn from_db_count(value: Option<i64>) -> Metric<u64> {
    value.and_then(|n| u64::try_from(n).ok()).into()
}

impl SnapshotRow {
    /// Builds the row persisted for `scored` on `snapshot_date`.
    #[must_use]
    pub fn from_scored(snapshot_date: NaiveDate, run_id: i64, scored: &ScoredArticle) -> Self {
        let a = &scored.article;
        Self {
            snapshot_date,
            run_id,
            page_path: a.page_path.clone(),
            post_name: a.post_name.clone(),
            post_id: a.post_id.known(),
            post_title: a.post_title.clone().known(),
            pageviews: to_db_count(a.pageviews),
            sessions: to_db_count(a.sessions),
            avg_session_duration: a.avg_session_duration.known(),
            clicks: to_db_count(a.clicks),
            impressions: to_db_count(a.impressions),
            ctr: a.ctr.known(),
            avg_position: a.position.known(),
            last_modified: a.last_modified.known(),
            days_since_update: a.days_since_update.known(),
            focus_keyword: a.focus_keyword.clone().known(),
            keyword_score: a.keyword_score.known(),
            readability_score: a.readability_score.known(),
            is_cornerstone: a.is_cornerstone.known(),
            composite_score: scored.composite_score,
            rank_position: i32::try_from(scored.rank_position).unwrap_or(i32::MAX),
        }
    }

    /// Converts the stored row back into a [`ScoredArticle`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] if `rank_position` is not positive.
    pub fn into_scored(self) -> Result<ScoredArticle, DbError> {
        let rank_position = u32::try_from(self.rank_position)
            .ok()
            .filter(|r| *r >= 1)
            .ok_or_else(|| DbError::Corrupt {
                column: "rank_position",
                value: self.rank_position.to_string(),
            })?;

        let article = ArticleRecord {
            page_path: self.page_path,
            post_name: self.post_name,
            post_id: self.post_id.into(),
            post_title: self.post_title.into(),
            pageviews: from_db_count(self.pageviews),
            sessions: from_db_count(self.sessions),
            avg_session_duration: self.avg_session_duration.into(),
            clicks: from_db_count(self.clicks),
            impressions: from_db_count(self.impressions),
            ctr: self.ctr.into(),
            position: self.avg_position.into(),
            last_modified: self.last_modified.into(),
            days_since_update: self.days_since_update.into(),
            focus_keyword: self.focus_keyword.into(),
            keyword_score: self.keyword_score.into(),
            readability_score: self.readability_score.into(),
            is_cornerstone: self.is_cornerstone.into(),
        };

        Ok(ScoredArticle {
            article,
            composite_score: self.composite_score,
            rank_position,
        })
    }
}

const SNAPSHOT_COLUMNS: &str = "snapshot_date, run_id, page_path, post_name, post_id, \
     post_title, pageviews, sessions, avg_session_duration, clicks, impressions, ctr, \
     avg_position, last_modified, days_since_update, focus_keyword, keyword_score, \
     readability_score, is_cornerstone, composite_score, rank_position";

/// Checks that ranks are exactly `1..=k` and paths are distinct.
fn validate_ranking(articles: &[ScoredArticle]) -> Result<(), DbError> {
    let mut ranks: Vec<u32> = articles.iter().map(|a| a.rank_position).collect();
    ranks.sort_unstable();
    if ranks.iter().zip(1_u32..).any(|(r, expected)| *r != expected) {
        return Err(DbError::InvalidSnapshot(
            "rank positions must be a contiguous permutation of 1..=N".to_string(),
        ));
    }

    let mut paths: Vec<&str> = articles.iter().map(ScoredArticle::page_path).collect();
    paths.sort_unstable();
    if paths.windows(2).any(|w| w[0] == w[1]) {
        return Err(DbError::InvalidSnapshot(
            "page paths must be unique within a snapshot".to_string(),
        ));
    }
    Ok(())
}

fn rows_into_scored(rows: Vec<SnapshotRow>) -> Result<Vec<ScoredArticle>, DbError> {
    rows.into_iter().map(SnapshotRow::into_scored).collect()
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns the most recent snapshot strictly before `before`, ordered by rank.
///
/// An empty vector means no earlier snapshot exists (first run).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Corrupt`] for
/// an unreadable row.
pub async fn previous_snapshot(
    pool: &PgPool,
    before: NaiveDate,
) -> Result<Vec<ScoredArticle>, DbError> {
    let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM core_article_snapshots \
         WHERE snapshot_date = ( \
             SELECT MAX(snapshot_date) FROM core_article_snapshots WHERE snapshot_date < $1 \
         ) \
         ORDER BY rank_position"
    ))
    .bind(before)
    .fetch_all(pool)
    .await?;

    rows_into_scored(rows)
}

/// Returns the snapshot stored for `date`, ordered by rank (empty if none).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Corrupt`] for
/// an unreadable row.
pub async fn snapshot_on(pool: &PgPool, date: NaiveDate) -> Result<Vec<ScoredArticle>, DbError> {
    let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM core_article_snapshots \
         WHERE snapshot_date = $1 \
         ORDER BY rank_position"
    ))
    .bind(date)
    .fetch_all(pool)
    .await?;

    rows_into_scored(rows)
}

/// Returns the date of the newest stored snapshot, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_snapshot_date(pool: &PgPool) -> Result<Option<NaiveDate>, DbError> {
    let date = sqlx::query_scalar::<_, Option<NaiveDate>>(
        "SELECT MAX(snapshot_date) FROM snapshot_days",
    )
    .fetch_one(pool)
    .await?;
    Ok(date)
}

/// Returns `true` if a snapshot has already been stored for `date`, including
/// one whose ranked set was empty.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn snapshot_exists(pool: &PgPool, date: NaiveDate) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM snapshot_days WHERE snapshot_date = $1)",
    )
    .bind(date)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

fn map_duplicate(err: sqlx::Error, date: NaiveDate) -> DbError {
    if is_unique_violation(&err) {
        DbError::SnapshotExists { date }
    } else {
        DbError::Sqlx(err)
    }
}

async fn insert_snapshot_rows(
    conn: &mut PgConnection,
    date: NaiveDate,
    run_id: i64,
    articles: &[ScoredArticle],
) -> Result<usize, DbError> {
    // Claims the date. A concurrent writer blocks here on the primary key
    // until the first commits, then fails with a unique violation.
    let article_count = i32::try_from(articles.len())
        .map_err(|_| DbError::InvalidSnapshot(format!("{} articles", articles.len())))?;
    sqlx::query(
        "INSERT INTO snapshot_days (snapshot_date, run_id, article_count) VALUES ($1, $2, $3)",
    )
    .bind(date)
    .bind(run_id)
    .bind(article_count)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_duplicate(e, date))?;

    let insert_sql = format!(
        "INSERT INTO core_article_snapshots ({SNAPSHOT_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                 $18, $19, $20, $21)"
    );

    for scored in articles {
        let row = SnapshotRow::from_scored(date, run_id, scored);
        sqlx::query(&insert_sql)
            .bind(row.snapshot_date)
            .bind(row.run_id)
            .bind(&row.page_path)
            .bind(&row.post_name)
            .bind(row.post_id)
            .bind(&row.post_title)
            .bind(row.pageviews)
            .bind(row.sessions)
            .bind(row.avg_session_duration)
            .bind(row.clicks)
            .bind(row.impressions)
            .bind(row.ctr)
            .bind(row.avg_position)
            .bind(row.last_modified)
            .bind(row.days_since_update)
            .bind(&row.focus_keyword)
            .bind(row.keyword_score)
            .bind(row.readability_score)
            .bind(row.is_cornerstone)
            .bind(row.composite_score)
            .bind(row.rank_position)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_duplicate(e, date))?;
    }

    Ok(articles.len())
}

/// Writes the ranked snapshot for `date` in a single transaction.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// - [`DbError::InvalidSnapshot`] if ranks are not `1..=N` or paths repeat.
/// - [`DbError::SnapshotExists`] if `date` already has a snapshot; nothing
///   is written.
/// - [`DbError::Sqlx`] on any other database failure.
pub async fn write_snapshot(
    pool: &PgPool,
    date: NaiveDate,
    run_id: i64,
    articles: &[ScoredArticle],
) -> Result<usize, DbError> {
    validate_ranking(articles)?;

    let mut tx = pool.begin().await?;
    let written = insert_snapshot_rows(&mut tx, date, run_id, articles).await?;
    tx.commit().await?;
    Ok(written)
}

/// Writes the snapshot and its alerts together, all-or-nothing.
///
/// Returns `(snapshot_rows, alert_rows)`.
///
/// # Errors
///
/// Same as [`write_snapshot`]; an alert insert failure rolls back the
/// snapshot as well.
pub async fn persist_snapshot(
    pool: &PgPool,
    date: NaiveDate,
    run_id: i64,
    articles: &[ScoredArticle],
    alerts: &[Alert],
) -> Result<(usize, usize), DbError> {
    validate_ranking(articles)?;

    let mut tx = pool.begin().await?;
    let written = insert_snapshot_rows(&mut tx, date, run_id, articles).await?;
    let alert_rows = insert_alerts(&mut tx, run_id, alerts).await?;
    tx.commit().await?;

    tracing::debug!(%date, run_id, written, alert_rows, "snapshot persisted");
    Ok((written, alert_rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(path: &str, rank: u32) -> ScoredArticle {
        ScoredArticle {
            article: ArticleRecord::new(path),
            composite_score: 10.0,
            rank_position: rank,
        }
    }

    #[test]
    fn contiguous_ranking_is_valid() {
        let articles = vec![scored("/b", 2), scored("/a", 1), scored("/c", 3)];
        assert!(validate_ranking(&articles).is_ok());
    }

    #[test]
    fn empty_ranking_is_valid() {
        assert!(validate_ranking(&[]).is_ok());
    }

    #[test]
    fn gap_in_ranking_is_rejected() {
        let articles = vec![scored("/a", 1), scored("/b", 3)];
        assert!(matches!(
            validate_ranking(&articles),
            Err(DbError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn duplicate_rank_is_rejected() {
        let articles = vec![scored("/a", 1), scored("/b", 1)];
        assert!(validate_ranking(&articles).is_err());
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let articles = vec![scored("/a", 1), scored("/a", 2)];
        assert!(validate_ranking(&articles).is_err());
    }

    #[test]
    fn row_round_trip_preserves_unknowns() {
        let mut s = scored("/grep-command", 4);
        s.article.pageviews = Metric::Known(1200);
        s.article.position = Metric::Known(6.5);
        let row = SnapshotRow::from_scored(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(), 9, &s);
        assert_eq!(row.pageviews, Some(1200));
        assert_eq!(row.clicks, None);
        assert_eq!(row.rank_position, 4);

        let back = row.into_scored().unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn non_positive_rank_is_corrupt() {
        let s = scored("/a", 1);
        let mut row = SnapshotRow::from_scored(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(), 1, &s);
        row.rank_position = 0;
        assert!(matches!(
            row.into_scored(),
            Err(DbError::Corrupt { column: "rank_position", .. })
        ));
    }
}
