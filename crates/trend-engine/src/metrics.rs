//! Cluster metric calculation.
//!
//! Three raw metrics per merged cluster, each normalized against the run
//! maximum onto 0-100:
//! - engagement: `sum(score * 0.7 + comments * 0.3)` over members
//! - freshness: linear decay `max((W - days) / W * 100, 0)` per member,
//!   aggregated per [`FreshnessAggregation`]
//! - frequency: distinct member count

use chrono::{DateTime, Utc};

use trend_types::{ClusterMetrics, FreshnessAggregation, MergedCluster, Post};

use crate::store::PostStore;

/// Weight of the net score in per-post engagement.
const SCORE_WEIGHT: f64 = 0.7;

/// Weight of the comment count in per-post engagement.
const COMMENT_WEIGHT: f64 = 0.3;

/// Upper bound of every normalized score.
pub const MAX_SCORE: f64 = 100.0;

/// Computes raw and normalized metrics for merged clusters.
#[derive(Debug, Clone)]
pub struct MetricCalculator {
    window_days: u32,
    aggregation: FreshnessAggregation,
}

impl MetricCalculator {
    /// Create a calculator with a decay window (days) and aggregation.
    pub fn new(window_days: u32, aggregation: FreshnessAggregation) -> Self {
        Self {
            window_days,
            aggregation,
        }
    }

    /// Engagement contributed by one post.
    pub fn post_engagement(post: &Post) -> f64 {
        post.score as f64 * SCORE_WEIGHT + post.num_comments as f64 * COMMENT_WEIGHT
    }

    /// Freshness of one post (0-100) at `reference`.
    pub fn post_freshness(&self, post: &Post, reference: DateTime<Utc>) -> f64 {
        let window = self.window_days as f64;
        if window <= 0.0 {
            return 0.0;
        }
        let days = post.age_days(reference) as f64;
        (((window - days) / window) * MAX_SCORE).max(0.0)
    }

    /// Raw metrics for one cluster; normalized fields are left at zero.
    pub fn raw_metrics(
        &self,
        cluster: &MergedCluster,
        store: &PostStore,
        reference: DateTime<Utc>,
    ) -> ClusterMetrics {
        let members: Vec<&Post> = cluster
            .post_ids
            .iter()
            .filter_map(|id| store.get(id))
            .collect();

        let raw_engagement = members.iter().map(|p| Self::post_engagement(p)).sum();

        ClusterMetrics {
            raw_engagement,
            raw_freshness: self.aggregate_freshness(&members, reference),
            raw_frequency: members.len(),
            ..Default::default()
        }
    }

    fn aggregate_freshness(&self, members: &[&Post], reference: DateTime<Utc>) -> f64 {
        if members.is_empty() {
            return 0.0;
        }

        match self.aggregation {
            FreshnessAggregation::Mean => {
                let total: f64 = members
                    .iter()
                    .map(|p| self.post_freshness(p, reference))
                    .sum();
                total / members.len() as f64
            }
            FreshnessAggregation::Max => members
                .iter()
                .map(|p| self.post_freshness(p, reference))
                .fold(0.0, f64::max),
            FreshnessAggregation::MostRecent => members
                .iter()
                .max_by_key(|p| p.created_at)
                .map(|p| self.post_freshness(p, reference))
                .unwrap_or(0.0),
        }
    }

    /// Raw plus normalized metrics for every cluster, in input order.
    pub fn compute(
        &self,
        clusters: &[MergedCluster],
        store: &PostStore,
        reference: DateTime<Utc>,
    ) -> Vec<ClusterMetrics> {
        let mut metrics: Vec<ClusterMetrics> = clusters
            .iter()
            .map(|c| self.raw_metrics(c, store, reference))
            .collect();

        let engagement = normalize(&metrics.iter().map(|m| m.raw_engagement).collect::<Vec<_>>());
        let freshness = normalize(&metrics.iter().map(|m| m.raw_freshness).collect::<Vec<_>>());
        let frequency = normalize(
            &metrics
                .iter()
                .map(|m| m.raw_frequency as f64)
                .collect::<Vec<_>>(),
        );

        for (i, m) in metrics.iter_mut().enumerate() {
            m.engagement_score = engagement[i];
            m.freshness_score = freshness[i];
            m.frequency_score = frequency[i];
        }

        metrics
    }
}

/// Scale values onto 0-100 relative to their maximum.
///
/// When the maximum is not positive every value maps to 0; negative
/// values clamp to 0.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= 0.0 {
        return vec![0.0; values.len()];
    }

    values
        .iter()
        .map(|v| (v / max * MAX_SCORE).clamp(0.0, MAX_SCORE))
        .collect()
}
