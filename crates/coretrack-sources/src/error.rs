use thiserror::Error;

/// Errors returned by the metric source adapters.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failure talking to the content database.
    #[error("content database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The adapter was constructed with unusable settings.
    #[error("invalid source configuration: {0}")]
    InvalidConfig(String),
}
