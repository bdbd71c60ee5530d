//! Engine output types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cluster::RankedCluster;
use crate::config::{ClusteringMode, ScoringWeights};

/// Why a source contributed no clusters to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Transport/API failures persisted through every retry
    RetriesExhausted,
    /// The capability kept returning a malformed title assignment
    ContractViolation,
    /// The run was cancelled before the source reached a result
    Cancelled,
    /// The capability reported an error that retrying cannot fix
    NonRetryable,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureClass::RetriesExhausted => write!(f, "retries exhausted"),
            FailureClass::ContractViolation => write!(f, "contract violation"),
            FailureClass::Cancelled => write!(f, "cancelled"),
            FailureClass::NonRetryable => write!(f, "non-retryable"),
        }
    }
}

/// A source excluded from clustering for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedSource {
    pub source: String,
    pub failure: FailureClass,
    /// Last error message observed
    pub message: String,
    /// Capability invocations made before giving up
    pub attempts: u32,
}

/// Run-level counts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_clusters_before_filtering: usize,
    pub total_clusters_after_filtering: usize,
    /// Distinct posts that ended up in some merged cluster
    pub total_posts_considered: usize,
    /// Posts held by the post store
    pub total_posts_ingested: usize,
    /// Posts dropped at ingestion because their id was already taken
    pub duplicate_posts_dropped: usize,
    /// Sum of raw engagement across all clusters
    pub total_engagement: f64,
    pub sources_total: usize,
    pub sources_excluded: usize,
}

/// Immutable snapshot produced by one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Unique run identifier (ULID)
    pub run_id: String,
    /// Reference time used for freshness decay
    pub generated_at: DateTime<Utc>,
    pub clustering_mode: ClusteringMode,
    pub freshness_window_days: u32,
    pub weights: ScoringWeights,
    /// Relevance cutoff; absent when nothing was ranked
    pub elbow_threshold: Option<f64>,
    /// Every merged cluster in rank order
    pub ranked: Vec<RankedCluster>,
    /// Clusters at or above the threshold (a prefix of `ranked`)
    pub selected: Vec<RankedCluster>,
    pub excluded_sources: Vec<ExcludedSource>,
    pub summary: ReportSummary,
}

impl Report {
    /// True when at least one source was excluded.
    pub fn is_degraded(&self) -> bool {
        !self.excluded_sources.is_empty()
    }

    /// True when no cluster was ranked.
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Names of the selected clusters in rank order.
    pub fn selected_names(&self) -> Vec<&str> {
        self.selected
            .iter()
            .map(|c| c.cluster.name.as_str())
            .collect()
    }

    /// Look up the exclusion record for a source.
    pub fn excluded(&self, source: &str) -> Option<&ExcludedSource> {
        self.excluded_sources.iter().find(|e| e.source == source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_report() -> Report {
        Report {
            run_id: "01J0000000000000000000000".to_string(),
            generated_at: Utc::now(),
            clustering_mode: ClusteringMode::PerSource,
            freshness_window_days: 14,
            weights: ScoringWeights::default(),
            elbow_threshold: None,
            ranked: Vec::new(),
            selected: Vec::new(),
            excluded_sources: Vec::new(),
            summary: ReportSummary::default(),
        }
    }

    #[test]
    fn test_empty_report() {
        let report = empty_report();
        assert!(report.is_empty());
        assert!(!report.is_degraded());
        assert!(report.selected_names().is_empty());
    }

    #[test]
    fn test_excluded_lookup() {
        let mut report = empty_report();
        report.excluded_sources.push(ExcludedSource {
            source: "AI".to_string(),
            failure: FailureClass::ContractViolation,
            message: "missing title".to_string(),
            attempts: 3,
        });

        assert!(report.is_degraded());
        assert_eq!(
            report.excluded("AI").map(|e| e.failure),
            Some(FailureClass::ContractViolation)
        );
        assert!(report.excluded("MachineLearning").is_none());
    }

    #[test]
    fn test_failure_class_serialization() {
        let json = serde_json::to_string(&FailureClass::RetriesExhausted).unwrap();
        assert_eq!(json, "\"retries_exhausted\"");
        assert_eq!(FailureClass::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_absent_threshold_serializes_as_null() {
        let value = serde_json::to_value(empty_report()).unwrap();
        assert!(value["elbow_threshold"].is_null());
        assert_eq!(value["clustering_mode"], "per_source");
    }
}
