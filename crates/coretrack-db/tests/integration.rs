//! Offline unit tests for coretrack-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use coretrack_core::{AppConfig, ArticleRecord, Environment, Metric, ScoredArticle};
use coretrack_db::{PoolConfig, RunRow, RunType, SnapshotRow};
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        policy_path: None,
        reports_dir: PathBuf::from("./reports"),
        window_days: 90,
        site_url: None,
        analytics: None,
        search_console: None,
        content: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        http_timeout_secs: 30,
        http_user_agent: "ua".to_string(),
        http_max_retries: 3,
        http_backoff_base_ms: 1000,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn run_row_source_counts_treat_null_as_unavailable() {
    let date = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
    let row = RunRow {
        id: 1,
        public_id: Uuid::new_v4(),
        run_type: RunType::Track.as_str().to_string(),
        status: "succeeded".to_string(),
        snapshot_date: date,
        window_start: date,
        window_end: date,
        analytics_pages: Some(100),
        search_console_pages: None,
        content_pages: Some(87),
        records_processed: 30,
        alerts_generated: 4,
        error_message: None,
        started_at: Utc::now(),
        completed_at: Some(Utc::now()),
    };

    let counts = row.source_counts();
    assert_eq!(counts.analytics, Some(100));
    assert_eq!(counts.search_console, None);
    assert_eq!(counts.content, Some(87));
    assert!(!counts.all_unavailable());
}

#[test]
fn snapshot_row_maps_unknown_metrics_to_null() {
    let mut article = ArticleRecord::new("/sed-command");
    article.clicks = Metric::Known(320);
    article.focus_keyword = Metric::Known("sed".to_string());
    let scored = ScoredArticle {
        article,
        composite_score: 96.0,
        rank_position: 2,
    };

    let row = SnapshotRow::from_scored(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(), 5, &scored);
    assert_eq!(row.page_path, "/sed-command");
    assert_eq!(row.clicks, Some(320));
    assert_eq!(row.pageviews, None);
    assert_eq!(row.days_since_update, None);
    assert_eq!(row.focus_keyword.as_deref(), Some("sed"));
    assert_eq!(row.run_id, 5);
}

#[test]
fn run_type_labels_match_schema() {
    assert_eq!(RunType::Track.as_str(), "track");
    assert_eq!(RunType::Attention.as_str(), "attention");
}
