//! # trend-types
//!
//! Shared domain types for the Trend Radar workspace.
//!
//! This crate defines the data structures passed between the grouping
//! capability, the scoring engine and the CLI:
//! - Posts: immutable records harvested from discussion sources
//! - Clusters: per-source groupings and their cross-source merge
//! - Reports: the ranked, filtered output of one engine run
//! - Settings: engine and grouper configuration
//!
//! ## Usage
//!
//! ```rust
//! use trend_types::{EngineConfig, Post};
//!
//! let config = EngineConfig::default();
//! assert!(config.validate().is_ok());
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod post;
pub mod report;

pub use cluster::{merge_key, ClusterMetrics, MergedCluster, RankedCluster, SourceCluster};
pub use config::{
    ClusteringMode, EngineConfig, FreshnessAggregation, GrouperProvider, GrouperSettings,
    ScoringWeights, Settings,
};
pub use error::TrendError;
pub use post::{Post, PostId};
pub use report::{ExcludedSource, FailureClass, Report, ReportSummary};
