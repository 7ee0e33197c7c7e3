//! Shared HTTP plumbing for the Google API adapters.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::SourceError;
use crate::HttpOptions;

pub(crate) fn build_client(options: &HttpOptions) -> Result<Client, SourceError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(options.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(options.user_agent.clone())
        .build()?)
}

/// Parses `base_url`, ensuring it ends with exactly one slash so that
/// [`Url::join`] appends to it rather than replacing the last segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, SourceError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised)
        .map_err(|e| SourceError::InvalidConfig(format!("invalid base URL '{base_url}': {e}")))
}

/// Sends an authenticated JSON POST and parses the response body as JSON.
///
/// Non-2xx responses become [`SourceError::Api`], carrying the Google error
/// envelope's message when present.
pub(crate) async fn post_json(
    client: &Client,
    url: &Url,
    access_token: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, SourceError> {
    let response = client
        .post(url.clone())
        .bearer_auth(access_token)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(SourceError::Api {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }

    serde_json::from_str(&text).map_err(|e| SourceError::Deserialize {
        context: url.path().to_string(),
        source: e,
    })
}

/// Extracts `error.message` from a Google API error body, falling back to the
/// raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_reads_google_envelope() {
        let body = r#"{"error":{"code":403,"message":"User does not have sufficient permissions","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(body), "User does not have sufficient permissions");
    }

    #[test]
    fn error_message_falls_back_to_raw_text() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("http://localhost:8080/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/");
    }

    #[test]
    fn parse_base_url_rejects_garbage() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(SourceError::InvalidConfig(_))
        ));
    }
}
