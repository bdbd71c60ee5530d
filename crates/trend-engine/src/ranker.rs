//! Weighted relevance ranking.

use std::cmp::Ordering;

use trend_types::{ClusterMetrics, MergedCluster, RankedCluster, ScoringWeights, TrendError};

use crate::metrics::MAX_SCORE;

/// Combines normalized sub-scores into one relevance score and orders
/// clusters by it.
///
/// Ordering is total: relevance desc, raw frequency desc, display name
/// asc, merge key asc. The same input always yields the same ranking.
#[derive(Debug, Clone)]
pub struct RelevanceRanker {
    weights: ScoringWeights,
}

impl RelevanceRanker {
    /// Create a ranker, rejecting invalid weights.
    pub fn new(weights: ScoringWeights) -> Result<Self, TrendError> {
        weights.validate().map_err(TrendError::InvalidConfig)?;
        Ok(Self { weights })
    }

    /// Weights in use.
    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Weighted relevance (0-100) of normalized metrics.
    pub fn relevance(&self, metrics: &ClusterMetrics) -> f64 {
        let score = metrics.engagement_score * self.weights.engagement
            + metrics.freshness_score * self.weights.freshness
            + metrics.frequency_score * self.weights.frequency;
        score.clamp(0.0, MAX_SCORE)
    }

    /// Score and sort clusters, assigning 1-based ranks.
    pub fn rank(&self, scored: Vec<(MergedCluster, ClusterMetrics)>) -> Vec<RankedCluster> {
        let mut ranked: Vec<RankedCluster> = scored
            .into_iter()
            .map(|(cluster, mut metrics)| {
                metrics.relevance_score = self.relevance(&metrics);
                RankedCluster {
                    rank: 0,
                    cluster,
                    metrics,
                }
            })
            .collect();

        ranked.sort_by(compare_ranked);
        for (i, cluster) in ranked.iter_mut().enumerate() {
            cluster.rank = i + 1;
        }
        ranked
    }
}

fn compare_ranked(a: &RankedCluster, b: &RankedCluster) -> Ordering {
    b.metrics
        .relevance_score
        .total_cmp(&a.metrics.relevance_score)
        .then_with(|| b.metrics.raw_frequency.cmp(&a.metrics.raw_frequency))
        .then_with(|| a.cluster.name.cmp(&b.cluster.name))
        .then_with(|| a.cluster.key.cmp(&b.cluster.key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(name: &str) -> MergedCluster {
        MergedCluster {
            name: name.to_string(),
            key: name.to_lowercase(),
            post_ids: [format!("{name}-1")].into_iter().collect(),
            sources: ["s".to_string()].into_iter().collect(),
        }
    }

    fn metrics(engagement: f64, freshness: f64, frequency: f64, raw_frequency: usize) -> ClusterMetrics {
        ClusterMetrics {
            engagement_score: engagement,
            freshness_score: freshness,
            frequency_score: frequency,
            raw_frequency,
            ..Default::default()
        }
    }

    fn ranker() -> RelevanceRanker {
        RelevanceRanker::new(ScoringWeights::default()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_weights() {
        let result = RelevanceRanker::new(ScoringWeights::new(0.5, 0.5, 0.5));
        assert!(matches!(result, Err(TrendError::InvalidConfig(_))));
    }

    #[test]
    fn test_relevance_formula() {
        let score = ranker().relevance(&metrics(100.0, 50.0, 20.0, 1));
        // 100*0.4 + 50*0.35 + 20*0.25
        assert!((score - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_all_max_scores_give_100() {
        let score = ranker().relevance(&metrics(100.0, 100.0, 100.0, 3));
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_descending_with_ranks() {
        let ranked = ranker().rank(vec![
            (cluster("Low"), metrics(10.0, 10.0, 10.0, 1)),
            (cluster("High"), metrics(90.0, 90.0, 90.0, 1)),
            (cluster("Mid"), metrics(50.0, 50.0, 50.0, 1)),
        ]);

        let names: Vec<&str> = ranked.iter().map(|r| r.cluster.name.as_str()).collect();
        assert_eq!(names, vec!["High", "Mid", "Low"]);
        assert_eq!(
            ranked.iter().map(|r| r.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_ties_break_on_frequency_then_name() {
        let ranked = ranker().rank(vec![
            (cluster("Bravo"), metrics(50.0, 50.0, 50.0, 2)),
            (cluster("Alpha"), metrics(50.0, 50.0, 50.0, 2)),
            (cluster("Zulu"), metrics(50.0, 50.0, 50.0, 5)),
        ]);

        let names: Vec<&str> = ranked.iter().map(|r| r.cluster.name.as_str()).collect();
        assert_eq!(names, vec!["Zulu", "Alpha", "Bravo"]);
    }

    #[test]
    fn test_rank_reproducible() {
        let input = vec![
            (cluster("A"), metrics(40.0, 70.0, 10.0, 1)),
            (cluster("B"), metrics(70.0, 40.0, 10.0, 1)),
            (cluster("C"), metrics(40.0, 70.0, 10.0, 1)),
        ];
        let mut reversed = input.clone();
        reversed.reverse();

        assert_eq!(ranker().rank(input), ranker().rank(reversed));
    }

    #[test]
    fn test_rank_empty() {
        assert!(ranker().rank(Vec::new()).is_empty());
    }
}
