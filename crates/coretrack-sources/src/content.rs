//! Content adapter reading WordPress posts and Yoast SEO metadata from MySQL.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDateTime;
use coretrack_core::{
    post_name_from_path, ContentMetrics, ContentSettings, Metric, ReportWindow, SourceKind,
};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{MySql, QueryBuilder};

use crate::error::SourceError;
use crate::MetricSource;

/// Reads post metadata for published posts from the CMS database.
pub struct ContentSource {
    pool: MySqlPool,
    table_prefix: String,
}

/// One published post joined with its Yoast indexable row.
///
/// Numeric columns are cast to `SIGNED` in SQL so they decode as `i64`
/// regardless of the underlying unsigned or tinyint column types.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub post_id: i64,
    pub post_name: String,
    pub post_title: String,
    pub post_modified: Option<NaiveDateTime>,
    pub focus_keyword: Option<String>,
    pub keyword_score: Option<i64>,
    pub readability_score: Option<i64>,
    pub is_cornerstone: Option<i64>,
    pub days_since_update: Option<i64>,
}

impl ContentSource {
    /// Connects a small pool to the CMS database.
    ///
    /// The pool is created lazily so an unreachable CMS surfaces as a fetch
    /// failure rather than a startup failure.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidConfig`] for an unsafe table prefix and
    /// [`SourceError::Database`] if the connection URL cannot be parsed.
    pub fn connect(settings: &ContentSettings, acquire_timeout_secs: u64) -> Result<Self, SourceError> {
        validate_table_prefix(&settings.table_prefix)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .connect_lazy(&settings.database_url)?;
        Ok(Self {
            pool,
            table_prefix: settings.table_prefix.clone(),
        })
    }

    /// Wraps an existing pool.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidConfig`] for an unsafe table prefix.
    pub fn from_pool(pool: MySqlPool, table_prefix: &str) -> Result<Self, SourceError> {
        validate_table_prefix(table_prefix)?;
        Ok(Self {
            pool,
            table_prefix: table_prefix.to_string(),
        })
    }
}

/// Table prefixes are interpolated into SQL, so only `[A-Za-z0-9_]` is allowed.
fn validate_table_prefix(prefix: &str) -> Result<(), SourceError> {
    if prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(SourceError::InvalidConfig(format!(
            "table prefix '{prefix}' may only contain letters, digits and underscores"
        )))
    }
}

/// Groups requested paths by the post slug they resolve to.
fn paths_by_post_name(paths: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in paths {
        if let Some(name) = post_name_from_path(path) {
            by_name.entry(name).or_default().push(path.clone());
        }
    }
    by_name
}

fn build_query<'a>(
    prefix: &str,
    window: &ReportWindow,
    post_names: Option<impl Iterator<Item = &'a String>>,
) -> QueryBuilder<'a, MySql> {
    let mut qb = QueryBuilder::<MySql>::new(
        "SELECT CAST(p.ID AS SIGNED) AS post_id, \
                p.post_name, \
                p.post_title, \
                p.post_modified, \
                y.primary_focus_keyword AS focus_keyword, \
                CAST(y.primary_focus_keyword_score AS SIGNED) AS keyword_score, \
                CAST(y.readability_score AS SIGNED) AS readability_score, \
                CAST(y.is_cornerstone AS SIGNED) AS is_cornerstone, \
                CAST(DATEDIFF(",
    );
    qb.push_bind(window.end);
    qb.push(format!(
        ", p.post_modified) AS SIGNED) AS days_since_update \
         FROM {prefix}posts p \
         LEFT JOIN {prefix}yoast_indexable y \
           ON p.ID = y.object_id AND y.object_type = 'post' \
         WHERE p.post_type = 'post' AND p.post_status = 'publish'"
    ));
    if let Some(names) = post_names {
        qb.push(" AND p.post_name IN (");
        let mut list = qb.separated(", ");
        for name in names {
            list.push_bind(name);
        }
        list.push_unseparated(")");
    }
    qb.push(" ORDER BY p.ID");
    qb
}

/// Maps post rows back to the requested paths.
///
/// Without a filter each post is keyed by `/{post_name}`. A row whose slug
/// matches several requested paths yields one record per path.
fn rows_into_metrics(
    rows: Vec<PostRow>,
    requested: Option<&BTreeMap<String, Vec<String>>>,
) -> Vec<ContentMetrics> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let paths = match requested {
            Some(map) => map.get(&row.post_name).cloned().unwrap_or_default(),
            None => vec![format!("/{}", row.post_name)],
        };
        for page_path in paths {
            out.push(ContentMetrics {
                page_path,
                post_id: row.post_id,
                post_name: row.post_name.clone(),
                post_title: row.post_title.clone(),
                last_modified: row.post_modified,
                days_since_update: Metric::from(row.days_since_update),
                focus_keyword: Metric::non_blank(row.focus_keyword.clone()),
                keyword_score: Metric::from(row.keyword_score),
                readability_score: Metric::from(row.readability_score),
                is_cornerstone: row.is_cornerstone.unwrap_or(0) != 0,
            });
        }
    }
    out
}

impl MetricSource for ContentSource {
    type Record = ContentMetrics;

    const KIND: SourceKind = SourceKind::Content;

    async fn fetch(
        &self,
        window: &ReportWindow,
        paths: Option<&[String]>,
    ) -> Result<Vec<ContentMetrics>, SourceError> {
        let requested = paths.map(paths_by_post_name);
        if requested.as_ref().is_some_and(BTreeMap::is_empty) {
            return Ok(Vec::new());
        }

        let rows: Vec<PostRow> = build_query(
            &self.table_prefix,
            window,
            requested.as_ref().map(BTreeMap::keys),
        )
        .build_query_as()
        .fetch_all(&self.pool)
        .await?;

        let records = rows_into_metrics(rows, requested.as_ref());
        tracing::debug!(records = records.len(), %window, "content rows fetched");
        Ok(records)
    }
}
