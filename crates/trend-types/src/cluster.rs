//! Cluster data types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::post::PostId;

/// Normalize a label for equality matching.
///
/// Trims, collapses inner whitespace and case-folds. Used both as the
/// cross-source merge key for cluster names and as the title index key.
pub fn merge_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A named group of posts produced for a single source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCluster {
    /// Cluster name as returned by the grouping capability
    pub name: String,
    /// Source every member belongs to
    pub source: String,
    /// Member post ids
    pub post_ids: BTreeSet<PostId>,
}

impl SourceCluster {
    /// Create an empty cluster for a source.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            post_ids: BTreeSet::new(),
        }
    }

    /// Add member post ids.
    pub fn with_posts<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PostId>,
    {
        self.post_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Merge key for this cluster's name.
    pub fn key(&self) -> String {
        merge_key(&self.name)
    }
}

/// A cluster unified across every source that emitted the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedCluster {
    /// Display name
    pub name: String,
    /// Normalized merge key
    pub key: String,
    /// Deduplicated member post ids
    pub post_ids: BTreeSet<PostId>,
    /// Contributing sources (never empty)
    pub sources: BTreeSet<String>,
}

impl MergedCluster {
    /// Number of distinct member posts.
    pub fn len(&self) -> usize {
        self.post_ids.len()
    }

    /// True when the cluster has no members.
    pub fn is_empty(&self) -> bool {
        self.post_ids.is_empty()
    }
}

/// Raw and normalized scores attached to one merged cluster.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClusterMetrics {
    /// Sum of per-post engagement
    pub raw_engagement: f64,
    /// Aggregated per-post freshness (0-100)
    pub raw_freshness: f64,
    /// Distinct member count
    pub raw_frequency: usize,
    /// Engagement normalized against the run maximum (0-100)
    pub engagement_score: f64,
    /// Freshness normalized against the run maximum (0-100)
    pub freshness_score: f64,
    /// Frequency normalized against the run maximum (0-100)
    pub frequency_score: f64,
    /// Weighted combination of the three normalized scores (0-100)
    pub relevance_score: f64,
}

/// A merged cluster with its metrics and position in the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCluster {
    /// 1-based position in the full descending order
    pub rank: usize,
    #[serde(flatten)]
    pub cluster: MergedCluster,
    pub metrics: ClusterMetrics,
}

impl RankedCluster {
    /// Shorthand for the relevance score.
    pub fn relevance(&self) -> f64 {
        self.metrics.relevance_score
    }
}
