//! Domain model and pure pipeline stages for the core article tracker.
//!
//! Everything in this crate is deterministic and free of network or database
//! I/O: source adapters live in `coretrack-sources` and the snapshot store in
//! `coretrack-db`.

pub mod app_config;
pub mod attention;
pub mod config;
pub mod merge;
pub mod metric;
pub mod path;
pub mod policy;
pub mod rank;
pub mod scoring;
pub mod trend;
pub mod types;

use thiserror::Error;

pub use app_config::{
    AnalyticsSettings, AppConfig, ContentSettings, Environment, SearchConsoleSettings,
};
pub use attention::{evaluate_attention, AttentionCategory, AttentionItem};
pub use config::load_app_config;
pub use merge::merge_sources;
pub use metric::Metric;
pub use path::{normalize_path, post_name_from_path};
pub use policy::{load_policy, parse_policy, AlertThresholds, AttentionPolicy, Policy, ScoringWeights};
pub use rank::rank_articles;
pub use scoring::Scorer;
pub use trend::TrendEngine;
pub use types::{
    Alert, AlertKind, AnalyticsMetrics, ArticleRecord, ContentMetrics, ReportWindow,
    ScoredArticle, SearchMetrics, Severity, SourceCounts, SourceKind,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read policy file {path}: {source}")]
    PolicyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file: {0}")]
    PolicyFileParse(#[source] serde_yaml::Error),

    #[error("invalid policy: {0}")]
    Validation(String),
}
