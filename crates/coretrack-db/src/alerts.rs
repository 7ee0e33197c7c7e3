//! Append-only storage for `core_article_alerts`.

use chrono::{DateTime, NaiveDate, Utc};
use coretrack_core::{Alert, AlertKind, Severity};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

/// A row from the `core_article_alerts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlertRow {
    pub id: i64,
    pub snapshot_date: NaiveDate,
    pub run_id: i64,
    pub page_path: String,
    pub alert_kind: String,
    pub severity: String,
    pub message: String,
    pub metric_value: String,
    pub created_at: DateTime<Utc>,
}

impl AlertRow {
    /// Converts the stored row back into an [`Alert`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] if the kind or severity is unrecognised.
    pub fn into_alert(self) -> Result<Alert, DbError> {
        let kind = self
            .alert_kind
            .parse::<AlertKind>()
            .map_err(|_| DbError::Corrupt {
                column: "alert_kind",
                value: self.alert_kind.clone(),
            })?;
        let severity = self
            .severity
            .parse::<Severity>()
            .map_err(|_| DbError::Corrupt {
                column: "severity",
                value: self.severity.clone(),
            })?;
        Ok(Alert {
            snapshot_date: self.snapshot_date,
            page_path: self.page_path,
            kind,
            severity,
            message: self.message,
            metric_value: self.metric_value,
        })
    }
}

pub(crate) async fn insert_alerts(
    conn: &mut PgConnection,
    run_id: i64,
    alerts: &[Alert],
) -> Result<usize, DbError> {
    for alert in alerts {
        sqlx::query(
            "INSERT INTO core_article_alerts \
                 (snapshot_date, run_id, page_path, alert_kind, severity, message, metric_value) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(alert.snapshot_date)
        .bind(run_id)
        .bind(&alert.page_path)
        .bind(alert.kind.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.message)
        .bind(&alert.metric_value)
        .execute(&mut *conn)
        .await?;
    }
    Ok(alerts.len())
}

/// Appends `alerts` for `run_id` in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is written then.
pub async fn write_alerts(pool: &PgPool, run_id: i64, alerts: &[Alert]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let written = insert_alerts(&mut tx, run_id, alerts).await?;
    tx.commit().await?;
    Ok(written)
}

/// Lists alerts recorded for `date`, most severe first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Corrupt`] for
/// an unreadable row.
pub async fn list_alerts(pool: &PgPool, date: NaiveDate) -> Result<Vec<Alert>, DbError> {
    let rows = sqlx::query_as::<_, AlertRow>(
        "SELECT id, snapshot_date, run_id, page_path, alert_kind, severity, message, \
                metric_value, created_at \
         FROM core_article_alerts \
         WHERE snapshot_date = $1 \
         ORDER BY CASE severity WHEN 'critical' THEN 0 WHEN 'warning' THEN 1 ELSE 2 END, \
                  page_path, id",
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(AlertRow::into_alert).collect()
}
