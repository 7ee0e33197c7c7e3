//! Operator-tunable policy: leaderboard size, scoring weights, alert
//! thresholds and attention limits.
//!
//! Loaded from YAML. Every field has a default, so an empty file is a valid
//! policy and a partial file overrides only what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_TOP_N: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    pub top_n: usize,
    pub scoring: ScoringWeights,
    pub alerts: AlertThresholds,
    pub attention: AttentionPolicy,
    /// Paths that are never articles (home page, static pages). Sources drop
    /// them before records reach the merger.
    pub excluded_paths: Vec<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            scoring: ScoringWeights::default(),
            alerts: AlertThresholds::default(),
            attention: AttentionPolicy::default(),
            excluded_paths: ["/", "/index.html", "/about", "/contact"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Weights of the composite score. See [`crate::Scorer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringWeights {
    pub pageviews: f64,
    pub sessions: f64,
    pub clicks: f64,
    pub impressions: f64,
    /// Points per position above `position_bonus_cutoff`.
    pub position_bonus: f64,
    pub position_bonus_cutoff: f64,
    /// Points for content updated today, decaying linearly to zero at
    /// `recency_horizon_days`.
    pub recency: f64,
    pub recency_horizon_days: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            pageviews: 0.4,
            sessions: 0.2,
            clicks: 0.3,
            impressions: 0.01,
            position_bonus: 10.0,
            position_bonus_cutoff: 10.0,
            recency: 0.0,
            recency_horizon_days: 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertThresholds {
    pub stale_warning_days: i64,
    pub stale_critical_days: i64,
    /// Rank positions lost since the previous snapshot.
    pub rank_drop: u32,
    /// Percentage of pageviews lost since the previous snapshot.
    pub traffic_decline_pct: f64,
    /// Average search positions lost since the previous snapshot.
    pub position_decline: f64,
    /// Warn when average position is worse than this. Disabled when unset.
    pub poor_position: Option<f64>,
    /// Flag readability scores below this. Disabled when unset.
    pub low_readability: Option<i64>,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            stale_warning_days: 180,
            stale_critical_days: 365,
            rank_drop: 5,
            traffic_decline_pct: 20.0,
            position_decline: 5.0,
            poor_position: None,
            low_readability: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttentionPolicy {
    /// Rows requested from each traffic source.
    pub row_limit: u32,
    /// Items scoring at or below this are not reported.
    pub min_priority: i32,
    pub max_items: usize,
    pub critical_priority: i32,
    pub high_priority: i32,
}

impl Default for AttentionPolicy {
    fn default() -> Self {
        Self {
            row_limit: 500,
            min_priority: 20,
            max_items: 50,
            critical_priority: 80,
            high_priority: 50,
        }
    }
}

/// Load and validate a policy from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_policy(path: &Path) -> Result<Policy, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PolicyFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_policy(&content)
}

/// Parse and validate a policy from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text cannot be parsed or fails validation.
pub fn parse_policy(content: &str) -> Result<Policy, ConfigError> {
    // serde_yaml reads an empty document as unit, not as an empty map.
    let policy: Policy = if content.trim().is_empty() {
        Policy::default()
    } else {
        serde_yaml::from_str(content).map_err(ConfigError::PolicyFileParse)?
    };

    validate_policy(&policy)?;
    Ok(policy)
}

fn validate_policy(policy: &Policy) -> Result<(), ConfigError> {
    if policy.top_n == 0 {
        return Err(ConfigError::Validation(
            "top_n must be at least 1".to_string(),
        ));
    }

    let w = &policy.scoring;
    for (name, value) in [
        ("pageviews", w.pageviews),
        ("sessions", w.sessions),
        ("clicks", w.clicks),
        ("impressions", w.impressions),
        ("position_bonus", w.position_bonus),
        ("position_bonus_cutoff", w.position_bonus_cutoff),
        ("recency", w.recency),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Validation(format!(
                "scoring.{name} must be a finite, non-negative number (got {value})"
            )));
        }
    }
    if w.recency_horizon_days == 0 {
        return Err(ConfigError::Validation(
            "scoring.recency_horizon_days must be at least 1".to_string(),
        ));
    }

    let a = &policy.alerts;
    if a.stale_warning_days <= 0 || a.stale_warning_days >= a.stale_critical_days {
        return Err(ConfigError::Validation(format!(
            "alerts.stale_warning_days ({}) must be positive and below stale_critical_days ({})",
            a.stale_warning_days, a.stale_critical_days
        )));
    }
    if a.rank_drop == 0 {
        return Err(ConfigError::Validation(
            "alerts.rank_drop must be at least 1".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&a.traffic_decline_pct) {
        return Err(ConfigError::Validation(format!(
            "alerts.traffic_decline_pct must be within 0..=100 (got {})",
            a.traffic_decline_pct
        )));
    }
    if !a.position_decline.is_finite() || a.position_decline < 0.0 {
        return Err(ConfigError::Validation(
            "alerts.position_decline must be a finite, non-negative number".to_string(),
        ));
    }

    let t = &policy.attention;
    if t.high_priority > t.critical_priority {
        return Err(ConfigError::Validation(format!(
            "attention.high_priority ({}) must not exceed critical_priority ({})",
            t.high_priority, t.critical_priority
        )));
    }
    if t.row_limit == 0 || t.max_items == 0 {
        return Err(ConfigError::Validation(
            "attention.row_limit and attention.max_items must be at least 1".to_string(),
        ));
    }

    Ok(())
}
