//! Report assembly.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use trend_types::{EngineConfig, ExcludedSource, RankedCluster, Report, ReportSummary};

use crate::elbow::ElbowSelection;

/// Everything a run produced, ready to be packaged.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub ranked: Vec<RankedCluster>,
    pub selection: ElbowSelection,
    pub excluded: Vec<ExcludedSource>,
    pub sources_total: usize,
    pub posts_ingested: usize,
    pub duplicates_dropped: usize,
}

/// Package run artifacts into a report.
///
/// `selected` is the leading `selection.retained` entries of `ranked`;
/// ranks are carried over unchanged.
pub fn assemble_report(
    config: &EngineConfig,
    generated_at: DateTime<Utc>,
    artifacts: RunArtifacts,
) -> Report {
    let RunArtifacts {
        ranked,
        selection,
        excluded,
        sources_total,
        posts_ingested,
        duplicates_dropped,
    } = artifacts;

    let selected: Vec<RankedCluster> = ranked
        .iter()
        .take(selection.retained)
        .cloned()
        .collect();

    let considered: BTreeSet<&str> = ranked
        .iter()
        .flat_map(|r| r.cluster.post_ids.iter().map(String::as_str))
        .collect();

    let summary = ReportSummary {
        total_clusters_before_filtering: ranked.len(),
        total_clusters_after_filtering: selected.len(),
        total_posts_considered: considered.len(),
        total_posts_ingested: posts_ingested,
        duplicate_posts_dropped: duplicates_dropped,
        total_engagement: ranked.iter().map(|r| r.metrics.raw_engagement).sum(),
        sources_total,
        sources_excluded: excluded.len(),
    };

    Report {
        run_id: ulid::Ulid::new().to_string(),
        generated_at,
        clustering_mode: config.clustering_mode,
        freshness_window_days: config.freshness_window_days,
        weights: config.weights,
        elbow_threshold: selection.threshold,
        ranked,
        selected,
        excluded_sources: excluded,
        summary,
    }
}
