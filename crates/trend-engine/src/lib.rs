//! # trend-engine
//!
//! Trend relevance and clustering engine.
//!
//! Takes raw posts from several discussion sources, has them grouped into
//! topic clusters by a pluggable [`ThematicGrouper`](trend_grouping::ThematicGrouper),
//! merges same-named clusters across sources, scores each cluster on
//! engagement, freshness and frequency, and keeps only the clusters above
//! the elbow of the relevance curve.
//!
//! ## Features
//! - Bounded-concurrency grouping with retry, timeout and cancellation
//! - Per-source or global clustering
//! - Partial-failure tolerance: failed sources are excluded, not fatal
//! - Reproducible scoring with a total ranking order
//! - Adaptive cutoff via knee point detection

pub mod adapter;
pub mod elbow;
pub mod engine;
pub mod merger;
pub mod metrics;
pub mod ranker;
pub mod report;
pub mod store;

#[cfg(test)]
mod testing;

pub use adapter::{AdapterOutput, GroupingAdapter, RetryPolicy, SourceOutcome, GLOBAL_BATCH};
pub use elbow::{find_knee, perpendicular_distances, ElbowSelection, ElbowSelector};
pub use engine::TrendEngine;
pub use merger::merge_clusters;
pub use metrics::{normalize, MetricCalculator};
pub use ranker::RelevanceRanker;
pub use report::{assemble_report, RunArtifacts};
pub use store::PostStore;
