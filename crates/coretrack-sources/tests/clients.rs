//! Integration tests for the HTTP source adapters using wiremock HTTP mocks.

use chrono::NaiveDate;
use coretrack_core::{AnalyticsSettings, ReportWindow, SearchConsoleSettings};
use coretrack_sources::{
    AnalyticsClient, HttpOptions, MetricSource, SearchConsoleClient, SourceError,
};
use wiremock::matchers::{body_partial_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options() -> HttpOptions {
    HttpOptions {
        timeout_secs: 5,
        user_agent: "coretrack-test".to_string(),
        max_retries: 2,
        backoff_base_ms: 0,
    }
}

fn window() -> ReportWindow {
    ReportWindow::new(
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 9, 29).unwrap(),
    )
    .unwrap()
}

fn excluded() -> Vec<String> {
    vec!["/".to_string(), "/about".to_string()]
}

fn analytics_client(base_url: &str) -> AnalyticsClient {
    let settings = AnalyticsSettings {
        property_id: "354741599".to_string(),
        access_token: "ga-token".to_string(),
        row_limit: 100,
    };
    AnalyticsClient::with_base_url(&settings, options(), &excluded(), base_url)
        .expect("client construction should not fail")
}

fn search_client(base_url: &str) -> SearchConsoleClient {
    let settings = SearchConsoleSettings {
        site_url: "https://example.org/".to_string(),
        access_token: "gsc-token".to_string(),
        row_limit: 100,
    };
    SearchConsoleClient::with_base_url(&settings, options(), &excluded(), base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn analytics_fetch_parses_rows_and_drops_excluded_paths() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "dimensionHeaders": [{ "name": "pagePath" }],
        "metricHeaders": [
            { "name": "screenPageViews", "type": "TYPE_INTEGER" },
            { "name": "sessions", "type": "TYPE_INTEGER" },
            { "name": "averageSessionDuration", "type": "TYPE_SECONDS" }
        ],
        "rows": [
            {
                "dimensionValues": [{ "value": "/" }],
                "metricValues": [{ "value": "9000" }, { "value": "8000" }, { "value": "12.0" }]
            },
            {
                "dimensionValues": [{ "value": "/ubuntu-install/" }],
                "metricValues": [{ "value": "1000" }, { "value": "700" }, { "value": "95.25" }]
            },
            {
                "dimensionValues": [{ "value": "/grep-command?utm_source=x" }],
                "metricValues": [{ "value": "200" }, { "value": "150" }, { "value": "40" }]
            }
        ],
        "rowCount": 3
    });

    Mock::given(method("POST"))
        .and(path("/v1beta/properties/354741599:runReport"))
        .and(header("authorization", "Bearer ga-token"))
        .and(body_partial_json(serde_json::json!({
            "dateRanges": [{ "startDate": "2026-07-01", "endDate": "2026-09-29" }],
            "limit": 100
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = analytics_client(&server.uri());
    let records = client.fetch(&window(), None).await.expect("fetch should succeed");

    assert_eq!(records.len(), 2, "home page must be excluded");
    assert_eq!(records[0].page_path, "/ubuntu-install");
    assert_eq!(records[0].pageviews, 1000);
    assert_eq!(records[0].sessions, 700);
    assert_eq!(records[1].page_path, "/grep-command");
}

#[tokio::test]
async fn analytics_fetch_handles_empty_report() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "rowCount": 0 })))
        .mount(&server)
        .await;

    let records = analytics_client(&server.uri())
        .fetch(&window(), None)
        .await
        .expect("empty report is not an error");
    assert!(records.is_empty());
}

#[tokio::test]
async fn analytics_unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": 401, "message": "Request had invalid authentication credentials.", "status": "UNAUTHENTICATED" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = analytics_client(&server.uri())
        .fetch(&window(), None)
        .await
        .expect_err("401 should fail");
    match err {
        SourceError::Api { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("invalid authentication"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn analytics_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rows": [{
                "dimensionValues": [{ "value": "/a" }],
                "metricValues": [{ "value": "5" }, { "value": "4" }, { "value": "3.5" }]
            }]
        })))
        .mount(&server)
        .await;

    let records = analytics_client(&server.uri())
        .fetch(&window(), None)
        .await
        .expect("second attempt should succeed");
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn analytics_empty_filter_skips_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let records = analytics_client(&server.uri())
        .fetch(&window(), Some(&[]))
        .await
        .expect("empty filter should short-circuit");
    assert!(records.is_empty());
}

#[tokio::test]
async fn analytics_filter_matches_trailing_slash_paths() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "rows": [
            {
                "dimensionValues": [{ "value": "/a/" }],
                "metricValues": [{ "value": "500" }, { "value": "400" }, { "value": "30" }]
            },
            {
                "dimensionValues": [{ "value": "/unrequested/" }],
                "metricValues": [{ "value": "90" }, { "value": "80" }, { "value": "10" }]
            }
        ],
        "rowCount": 2
    });

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({
            "dimensionFilter": {
                "filter": {
                    "fieldName": "pagePath",
                    "inListFilter": { "values": ["/a", "/a/"] }
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let wanted = vec!["/a".to_string()];
    let records = analytics_client(&server.uri())
        .fetch(&window(), Some(&wanted))
        .await
        .expect("fetch should succeed");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].page_path, "/a");
    assert_eq!(records[0].pageviews, 500);
}

#[tokio::test]
async fn search_console_fetch_normalizes_urls() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "rows": [
            { "keys": ["https://example.org/"], "clicks": 50, "impressions": 900, "ctr": 0.055, "position": 1.2 },
            { "keys": ["https://example.org/grep-command/"], "clicks": 320, "impressions": 12000, "ctr": 0.0267, "position": 6.4 },
            { "keys": ["https://example.org/sed-command/#examples"], "clicks": 30, "impressions": 4000, "ctr": 0.0075, "position": 18.0 }
        ],
        "responseAggregationType": "byPage"
    });

    Mock::given(method("POST"))
        .and(path_regex(r"^/webmasters/v3/sites/[^/]+/searchAnalytics/query$"))
        .and(header("authorization", "Bearer gsc-token"))
        .and(body_partial_json(serde_json::json!({
            "startDate": "2026-07-01",
            "endDate": "2026-09-29",
            "dimensions": ["page"],
            "rowLimit": 100
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let records = search_client(&server.uri())
        .fetch(&window(), None)
        .await
        .expect("fetch should succeed");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].page_path, "/grep-command");
    assert_eq!(records[0].clicks, 320);
    assert_eq!(records[0].impressions, 12000);
    assert!((records[0].position - 6.4).abs() < 1e-9);
    assert_eq!(records[1].page_path, "/sed-command");
}

#[tokio::test]
async fn search_console_missing_rows_means_no_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "responseAggregationType": "byPage" })),
        )
        .mount(&server)
        .await;

    let records = search_client(&server.uri())
        .fetch(&window(), None)
        .await
        .expect("absent rows is not an error");
    assert!(records.is_empty());
}

#[tokio::test]
async fn search_console_malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = search_client(&server.uri())
        .fetch(&window(), None)
        .await
        .expect_err("html body should fail");
    assert!(matches!(err, SourceError::Deserialize { .. }), "got {err:?}");
}
