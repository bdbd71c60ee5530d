//! Trend engine orchestration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use trend_grouping::ThematicGrouper;
use trend_types::{EngineConfig, Post, RankedCluster, Report, SourceCluster, TrendError};

use crate::adapter::GroupingAdapter;
use crate::elbow::ElbowSelector;
use crate::merger::merge_clusters;
use crate::metrics::MetricCalculator;
use crate::ranker::RelevanceRanker;
use crate::report::{assemble_report, RunArtifacts};
use crate::store::PostStore;

/// Ranks trending topic clusters.
///
/// Pipeline: post store -> grouping adapter -> cross-source merge ->
/// metrics -> relevance ranking -> elbow selection -> report.
///
/// The configuration is validated once at construction; every run uses it
/// unchanged.
pub struct TrendEngine {
    config: EngineConfig,
    adapter: GroupingAdapter,
    metrics: MetricCalculator,
    ranker: RelevanceRanker,
    elbow: ElbowSelector,
}

impl TrendEngine {
    /// Create an engine, rejecting invalid configuration before any work.
    pub fn new(config: EngineConfig, grouper: Arc<dyn ThematicGrouper>) -> Result<Self, TrendError> {
        config.validate()?;

        Ok(Self {
            adapter: GroupingAdapter::new(grouper, &config),
            metrics: MetricCalculator::new(
                config.freshness_window_days,
                config.freshness_aggregation,
            ),
            ranker: RelevanceRanker::new(config.weights)?,
            elbow: ElbowSelector::new(config.apply_elbow, config.min_clusters_for_elbow),
            config,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full pipeline over `posts`.
    ///
    /// Freshness decays relative to `reference_time`. Sources that cannot
    /// be grouped, including those still pending when `cancel` fires, are
    /// listed as excluded. Empty input yields an empty report.
    pub async fn run(
        &self,
        posts: Vec<Post>,
        reference_time: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> Report {
        let store = PostStore::new(posts);
        info!(
            posts = store.len(),
            sources = store.source_count(),
            duplicates = store.duplicates_dropped(),
            mode = %self.config.clustering_mode,
            "Starting trend run"
        );

        let grouped = self
            .adapter
            .run(&store, self.config.clustering_mode, &cancel)
            .await;

        let ranked = self.score_clusters(&store, &grouped.clusters, reference_time);
        let scores: Vec<f64> = ranked.iter().map(RankedCluster::relevance).collect();
        let selection = self.elbow.select(&scores);

        info!(
            clusters = ranked.len(),
            selected = selection.retained,
            threshold = ?selection.threshold,
            excluded = grouped.excluded.len(),
            "Trend run complete"
        );

        assemble_report(
            &self.config,
            reference_time,
            RunArtifacts {
                ranked,
                selection,
                excluded: grouped.excluded,
                sources_total: store.source_count(),
                posts_ingested: store.len(),
                duplicates_dropped: store.duplicates_dropped(),
            },
        )
    }

    /// Merge, measure and rank already grouped clusters.
    pub fn score_clusters(
        &self,
        store: &PostStore,
        clusters: &[SourceCluster],
        reference_time: DateTime<Utc>,
    ) -> Vec<RankedCluster> {
        let merged = merge_clusters(clusters);
        let metrics = self.metrics.compute(&merged, store, reference_time);
        self.ranker.rank(merged.into_iter().zip(metrics).collect())
    }
}
