//! Grouping adapter.
//!
//! Drives the thematic grouping capability over the post store: one call
//! per source (or one call over everything in global mode), bounded
//! concurrency, retry with exponential backoff, a timeout per call and
//! cooperative cancellation. A source that cannot be grouped is excluded
//! and the run continues without it.

use std::sync::Arc;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use trend_grouping::{validate_assignment, GroupingError, ThematicGrouper, TitleGroup};
use trend_types::{ClusteringMode, EngineConfig, ExcludedSource, FailureClass, SourceCluster};

use crate::store::PostStore;

/// Batch label used for the single call made in global mode.
pub const GLOBAL_BATCH: &str = "all sources";

/// Retry settings for capability calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per batch, first call included
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound for a single call
    pub call_timeout: Duration,
}

impl RetryPolicy {
    /// Extract the retry settings from engine config.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Result of grouping one source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// The capability produced a valid assignment (possibly empty)
    Clustered {
        source: String,
        clusters: Vec<SourceCluster>,
        attempts: u32,
    },
    /// The source contributes nothing to this run
    Excluded(ExcludedSource),
}

/// Combined output over every source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterOutput {
    pub clusters: Vec<SourceCluster>,
    /// Sorted by source
    pub excluded: Vec<ExcludedSource>,
}

impl AdapterOutput {
    fn push(&mut self, outcome: SourceOutcome) {
        match outcome {
            SourceOutcome::Clustered { clusters, .. } => self.clusters.extend(clusters),
            SourceOutcome::Excluded(excluded) => self.excluded.push(excluded),
        }
    }

    fn finish(mut self) -> Self {
        self.excluded.sort_by(|a, b| a.source.cmp(&b.source));
        self
    }
}

/// Why a batch produced no groups.
#[derive(Debug)]
struct CallFailure {
    failure: FailureClass,
    message: String,
    attempts: u32,
}

impl CallFailure {
    fn cancelled(attempts: u32) -> Self {
        Self {
            failure: FailureClass::Cancelled,
            message: "run cancelled".to_string(),
            attempts,
        }
    }

    fn exhausted(error: &GroupingError, attempts: u32) -> Self {
        let failure = if error.is_contract_violation() {
            FailureClass::ContractViolation
        } else {
            FailureClass::RetriesExhausted
        };
        Self {
            failure,
            message: error.to_string(),
            attempts,
        }
    }

    fn permanent(error: &GroupingError, attempts: u32) -> Self {
        Self {
            failure: FailureClass::NonRetryable,
            message: error.to_string(),
            attempts,
        }
    }

    fn exclude(&self, source: &str) -> ExcludedSource {
        ExcludedSource {
            source: source.to_string(),
            failure: self.failure,
            message: self.message.clone(),
            attempts: self.attempts,
        }
    }
}

/// Invokes the grouping capability for the sources of a post store.
pub struct GroupingAdapter {
    grouper: Arc<dyn ThematicGrouper>,
    policy: RetryPolicy,
    max_concurrency: usize,
}

impl GroupingAdapter {
    /// Create an adapter using the concurrency and retry settings of `config`.
    pub fn new(grouper: Arc<dyn ThematicGrouper>, config: &EngineConfig) -> Self {
        Self {
            grouper,
            policy: RetryPolicy::from_config(config),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Retry settings in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Group every source of `store` in the given mode.
    pub async fn run(
        &self,
        store: &PostStore,
        mode: ClusteringMode,
        cancel: &CancellationToken,
    ) -> AdapterOutput {
        match mode {
            ClusteringMode::PerSource => self.group_sources(store, cancel).await,
            ClusteringMode::Global => self.group_global(store, cancel).await,
        }
    }

    /// One capability call per source, at most `max_concurrency` in flight.
    ///
    /// Returns once every source has reached a terminal outcome.
    pub async fn group_sources(
        &self,
        store: &PostStore,
        cancel: &CancellationToken,
    ) -> AdapterOutput {
        let outcomes: Vec<SourceOutcome> = stream::iter(store.sources())
            .map(|source| self.group_source(store, source, cancel))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut output = AdapterOutput::default();
        for outcome in outcomes {
            output.push(outcome);
        }
        output.finish()
    }

    /// Group the posts of a single source.
    ///
    /// A source without titles yields no clusters and makes no call.
    pub async fn group_source(
        &self,
        store: &PostStore,
        source: &str,
        cancel: &CancellationToken,
    ) -> SourceOutcome {
        let titles = store.titles_for_source(source);
        if titles.is_empty() {
            debug!(source, "No titles to group");
            return SourceOutcome::Clustered {
                source: source.to_string(),
                clusters: Vec::new(),
                attempts: 0,
            };
        }

        match self.call_with_retry(source, &titles, cancel).await {
            Ok((groups, attempts)) => {
                let clusters: Vec<SourceCluster> = groups
                    .iter()
                    .filter_map(|group| source_cluster(store, source, group))
                    .collect();
                info!(source, clusters = clusters.len(), attempts, "Grouped source");
                SourceOutcome::Clustered {
                    source: source.to_string(),
                    clusters,
                    attempts,
                }
            }
            Err(failure) => {
                warn!(
                    source,
                    failure = %failure.failure,
                    attempts = failure.attempts,
                    error = %failure.message,
                    "Excluding source"
                );
                SourceOutcome::Excluded(failure.exclude(source))
            }
        }
    }

    /// One capability call over every title; groups are split back per source.
    ///
    /// A failure excludes every source with the same failure class.
    pub async fn group_global(
        &self,
        store: &PostStore,
        cancel: &CancellationToken,
    ) -> AdapterOutput {
        let titles = store.all_titles();
        if titles.is_empty() {
            return AdapterOutput::default();
        }

        let mut output = AdapterOutput::default();
        match self.call_with_retry(GLOBAL_BATCH, &titles, cancel).await {
            Ok((groups, attempts)) => {
                for group in &groups {
                    output.clusters.extend(
                        store
                            .sources()
                            .filter_map(|source| source_cluster(store, source, group)),
                    );
                }
                info!(
                    groups = groups.len(),
                    clusters = output.clusters.len(),
                    attempts,
                    "Grouped all sources"
                );
            }
            Err(failure) => {
                warn!(
                    failure = %failure.failure,
                    attempts = failure.attempts,
                    error = %failure.message,
                    "Excluding all sources"
                );
                output.excluded = store.sources().map(|s| failure.exclude(s)).collect();
            }
        }
        output.finish()
    }

    /// Call the capability with retry, timeout and cancellation.
    async fn call_with_retry(
        &self,
        label: &str,
        titles: &[String],
        cancel: &CancellationToken,
    ) -> Result<(Vec<TitleGroup>, u32), CallFailure> {
        let mut backoff = self.policy.backoff();
        let mut attempts = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(CallFailure::cancelled(attempts));
            }

            attempts += 1;
            debug!(source = label, attempt = attempts, "Calling grouping capability");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CallFailure::cancelled(attempts)),
                result = tokio::time::timeout(
                    self.policy.call_timeout,
                    self.grouper.group(label, titles),
                ) => result,
            };

            let error = match result {
                Ok(Ok(groups)) => match validate_assignment(titles, &groups) {
                    Ok(()) => return Ok((groups, attempts)),
                    Err(e) => e,
                },
                Ok(Err(e)) => e,
                Err(_) => GroupingError::Timeout,
            };

            if !error.is_retryable() {
                error!(source = label, error = %error, "Grouping failed permanently");
                return Err(CallFailure::permanent(&error, attempts));
            }

            if attempts >= self.policy.max_attempts {
                error!(source = label, error = %error, "Max retries exceeded");
                return Err(CallFailure::exhausted(&error, attempts));
            }

            match backoff.next_backoff() {
                Some(duration) => {
                    warn!(
                        source = label,
                        error = %error,
                        retry_in_ms = duration.as_millis(),
                        "Grouping call failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(CallFailure::cancelled(attempts)),
                        _ = tokio::time::sleep(duration) => {}
                    }
                }
                None => {
                    error!(source = label, error = %error, "Backoff exhausted");
                    return Err(CallFailure::exhausted(&error, attempts));
                }
            }
        }
    }
}

/// Map one group back onto the posts of `source`; None when no member is there.
fn source_cluster(store: &PostStore, source: &str, group: &TitleGroup) -> Option<SourceCluster> {
    let ids = group
        .titles
        .iter()
        .flat_map(|title| store.ids_for_title(source, title).iter().cloned());
    let cluster = SourceCluster::new(group.cluster_name.trim(), source).with_posts(ids);
    (!cluster.post_ids.is_empty()).then_some(cluster)
}
