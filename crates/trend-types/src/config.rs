//! Configuration loading for trend-radar.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/trend-radar/config.toml`
//! (platform equivalent via `directories`).

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TrendError;

/// Allowed drift of the weight sum from 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Weights combining the three normalized sub-scores into relevance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_engagement_weight")]
    pub engagement: f64,

    #[serde(default = "default_freshness_weight")]
    pub freshness: f64,

    #[serde(default = "default_frequency_weight")]
    pub frequency: f64,
}

fn default_engagement_weight() -> f64 {
    0.4
}
fn default_freshness_weight() -> f64 {
    0.35
}
fn default_frequency_weight() -> f64 {
    0.25
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            engagement: default_engagement_weight(),
            freshness: default_freshness_weight(),
            frequency: default_frequency_weight(),
        }
    }
}

impl ScoringWeights {
    /// Create weights from explicit values (unvalidated).
    pub fn new(engagement: f64, freshness: f64, frequency: f64) -> Self {
        Self {
            engagement,
            freshness,
            frequency,
        }
    }

    /// Sum of the three weights.
    pub fn sum(&self) -> f64 {
        self.engagement + self.freshness + self.frequency
    }

    /// Validate that every weight is in [0, 1] and the sum is 1.0.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("engagement", self.engagement),
            ("freshness", self.freshness),
            ("frequency", self.frequency),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} weight must be 0.0-1.0, got {value}"));
            }
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(format!("weights must sum to 1.0, got {}", self.sum()));
        }
        Ok(())
    }
}

/// How posts are handed to the grouping capability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClusteringMode {
    /// One capability call per source; same-named clusters merged afterwards
    #[default]
    PerSource,
    /// One capability call over every title; groups split back per source
    Global,
}

impl std::fmt::Display for ClusteringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusteringMode::PerSource => write!(f, "per_source"),
            ClusteringMode::Global => write!(f, "global"),
        }
    }
}

/// How per-post freshness values are folded into one cluster value.
///
/// `Max` and `MostRecent` coincide under linear decay; both are kept so a
/// config file can state the intent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessAggregation {
    #[default]
    Mean,
    Max,
    MostRecent,
}

/// Scoring engine configuration.
///
/// Validated once by the engine at construction and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Days after which a post's freshness reaches zero
    #[serde(default = "default_freshness_window_days")]
    pub freshness_window_days: u32,

    /// Maximum concurrent grouping calls
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Grouping attempts per source, first call included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff interval between attempts (ms)
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single backoff interval (ms)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Timeout for a single grouping call (seconds)
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    #[serde(default)]
    pub clustering_mode: ClusteringMode,

    #[serde(default)]
    pub freshness_aggregation: FreshnessAggregation,

    /// Filter the ranking at the elbow point
    #[serde(default = "default_true")]
    pub apply_elbow: bool,

    /// Below this many clusters every cluster is retained
    #[serde(default = "default_min_clusters_for_elbow")]
    pub min_clusters_for_elbow: usize,

    /// Sub-score weights (must sum to 1.0)
    #[serde(default)]
    pub weights: ScoringWeights,
}

fn default_freshness_window_days() -> u32 {
    14
}
fn default_max_concurrency() -> usize {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    10_000
}
fn default_call_timeout_secs() -> u64 {
    120
}
fn default_true() -> bool {
    true
}
fn default_min_clusters_for_elbow() -> usize {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            freshness_window_days: default_freshness_window_days(),
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            clustering_mode: ClusteringMode::default(),
            freshness_aggregation: FreshnessAggregation::default(),
            apply_elbow: default_true(),
            min_clusters_for_elbow: default_min_clusters_for_elbow(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TrendError> {
        self.weights.validate().map_err(TrendError::InvalidConfig)?;

        if self.freshness_window_days == 0 {
            return Err(TrendError::InvalidConfig(
                "freshness_window_days must be > 0".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(TrendError::InvalidConfig(
                "max_concurrency must be > 0".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(TrendError::InvalidConfig(
                "max_retries must be > 0".to_string(),
            ));
        }
        if self.call_timeout_secs == 0 {
            return Err(TrendError::InvalidConfig(
                "call_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(TrendError::InvalidConfig(format!(
                "max_backoff_ms ({}) must be >= initial_backoff_ms ({})",
                self.max_backoff_ms, self.initial_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Which grouping backend to build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GrouperProvider {
    /// OpenAI-compatible chat completions endpoint
    #[default]
    OpenAi,
    /// Anthropic messages endpoint
    Anthropic,
    /// Offline keyword grouping, no network
    Keyword,
}

/// Grouping capability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrouperSettings {
    #[serde(default)]
    pub provider: GrouperProvider,

    /// Model name (e.g., "gpt-4o", "claude-3-5-haiku-latest")
    #[serde(default = "default_grouper_model")]
    pub model: String,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// HTTP request timeout (seconds)
    #[serde(default = "default_grouper_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_grouper_model() -> String {
    "gpt-4o".to_string()
}

fn default_grouper_timeout_secs() -> u64 {
    60
}

impl Default for GrouperSettings {
    fn default() -> Self {
        Self {
            provider: GrouperProvider::default(),
            model: default_grouper_model(),
            api_key: None,
            api_base_url: None,
            timeout_secs: default_grouper_timeout_secs(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub grouper: GrouperSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            grouper: GrouperSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/trend-radar/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (TREND_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TrendError> {
        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| TrendError::InvalidConfig(e.to_string()))?
            .set_default("grouper.model", default_grouper_model())
            .map_err(|e| TrendError::InvalidConfig(e.to_string()))?
            .add_source(
                File::with_name(&default_config_path().to_string_lossy()).required(false),
            );

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: TREND_LOG_LEVEL, TREND_ENGINE__MAX_CONCURRENCY, TREND_GROUPER__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("TREND")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TrendError::InvalidConfig(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| TrendError::InvalidConfig(e.to_string()))
    }
}

/// Location of the default config file (without extension).
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "trend-radar")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_valid() {
        let weights = ScoringWeights::default();
        assert!(weights.validate().is_ok());
        assert!((weights.engagement - 0.4).abs() < f64::EPSILON);
        assert!((weights.freshness - 0.35).abs() < f64::EPSILON);
        assert!((weights.frequency - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let weights = ScoringWeights::new(0.5, 0.35, 0.25);
        let err = weights.validate().unwrap_err();
        assert!(err.contains("sum to 1.0"));
    }

    #[test]
    fn test_weights_reject_negative() {
        let weights = ScoringWeights::new(1.2, -0.2, 0.0);
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_weights_tolerate_float_drift() {
        let weights = ScoringWeights::new(0.1 + 0.2, 0.3, 0.4);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.freshness_window_days, 14);
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.clustering_mode, ClusteringMode::PerSource);
        assert_eq!(config.freshness_aggregation, FreshnessAggregation::Mean);
        assert!(config.apply_elbow);
        assert_eq!(config.min_clusters_for_elbow, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_validation() {
        let mut config = EngineConfig {
            freshness_window_days: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TrendError::InvalidConfig(_))
        ));

        config.freshness_window_days = 7;
        config.max_concurrency = 0;
        assert!(config.validate().is_err());

        config.max_concurrency = 4;
        config.initial_backoff_ms = 2_000;
        config.max_backoff_ms = 1_000;
        assert!(config.validate().is_err());

        config.max_backoff_ms = 2_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_partial_deserialize() {
        let json = r#"{"weights": {"engagement": 0.5, "freshness": 0.25}, "clustering_mode": "global"}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!((config.weights.engagement - 0.5).abs() < f64::EPSILON);
        assert!((config.weights.frequency - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.clustering_mode, ClusteringMode::Global);
        assert_eq!(config.freshness_window_days, 14);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.grouper.provider, GrouperProvider::OpenAi);
        assert_eq!(settings.grouper.model, "gpt-4o");
    }

    #[test]
    fn test_provider_serialization() {
        assert_eq!(
            serde_json::to_string(&GrouperProvider::OpenAi).unwrap(),
            "\"openai\""
        );
        let provider: GrouperProvider = serde_json::from_str("\"keyword\"").unwrap();
        assert_eq!(provider, GrouperProvider::Keyword);
    }

    #[test]
    fn test_api_key_not_serialized() {
        let settings = GrouperSettings {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert!(!settings.log_level.is_empty());
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("config"));
    }
}
