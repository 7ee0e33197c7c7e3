use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Analytics (GA4 Data API) connection settings.
#[derive(Clone)]
pub struct AnalyticsSettings {
    pub property_id: String,
    pub access_token: String,
    pub row_limit: u32,
}

/// Search console connection settings.
#[derive(Clone)]
pub struct SearchConsoleSettings {
    pub site_url: String,
    pub access_token: String,
    pub row_limit: u32,
}

/// Content database (WordPress + Yoast) connection settings.
#[derive(Clone)]
pub struct ContentSettings {
    pub database_url: String,
    pub table_prefix: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub policy_path: Option<PathBuf>,
    pub reports_dir: PathBuf,
    pub window_days: u32,
    pub site_url: Option<String>,
    pub analytics: Option<AnalyticsSettings>,
    pub search_console: Option<SearchConsoleSettings>,
    pub content: Option<ContentSettings>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub http_max_retries: u32,
    pub http_backoff_base_ms: u64,
}

impl std::fmt::Debug for AnalyticsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsSettings")
            .field("property_id", &self.property_id)
            .field("access_token", &"[redacted]")
            .field("row_limit", &self.row_limit)
            .finish()
    }
}

impl std::fmt::Debug for SearchConsoleSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConsoleSettings")
            .field("site_url", &self.site_url)
            .field("access_token", &"[redacted]")
            .field("row_limit", &self.row_limit)
            .finish()
    }
}

impl std::fmt::Debug for ContentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSettings")
            .field("database_url", &"[redacted]")
            .field("table_prefix", &self.table_prefix)
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("policy_path", &self.policy_path)
            .field("reports_dir", &self.reports_dir)
            .field("window_days", &self.window_days)
            .field("site_url", &self.site_url)
            .field("analytics", &self.analytics)
            .field("search_console", &self.search_console)
            .field("content", &self.content)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_backoff_base_ms", &self.http_backoff_base_ms)
            .finish()
    }
}
