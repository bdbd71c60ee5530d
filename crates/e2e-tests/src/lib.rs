//! End-to-end test infrastructure for trend-radar.
//!
//! Provides a shared TestHarness, a table-driven grouper and fixture post
//! sets for E2E tests covering the full posts-to-report pipeline.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use trend_engine::TrendEngine;
use trend_grouping::{GroupingError, ThematicGrouper, TitleGroup};
use trend_types::{merge_key, EngineConfig, Post};

/// Shared test harness for E2E tests.
///
/// Owns a temp directory holding the posts file and report output.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Where `write_posts` puts the input file
    pub posts_path: PathBuf,
    /// Where tests ask the CLI layer to write the report
    pub report_path: PathBuf,
}

impl TestHarness {
    /// Create a new test harness with a temp directory.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let posts_path = temp_dir.path().join("posts.json");
        let report_path = temp_dir.path().join("out").join("report.json");

        Self {
            _temp_dir: temp_dir,
            posts_path,
            report_path,
        }
    }

    /// Serialize posts as a JSON array into `posts_path`.
    pub fn write_posts(&self, posts: &[Post]) {
        let json = serde_json::to_string_pretty(posts).expect("Failed to serialize posts");
        std::fs::write(&self.posts_path, json).expect("Failed to write posts file");
    }

    /// Write arbitrary text into `posts_path`.
    pub fn write_raw(&self, text: &str) {
        std::fs::write(&self.posts_path, text).expect("Failed to write posts file");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed reference time so freshness is reproducible.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 20, 12, 0, 0).unwrap()
}

/// Create a post `age_days` before the reference time.
pub fn make_post(
    id: &str,
    title: &str,
    source: &str,
    score: i64,
    comments: u64,
    age_days: i64,
) -> Post {
    Post::new(id, title, source, reference_time() - Duration::days(age_days))
        .with_score(score)
        .with_comments(comments)
        .with_url(format!("https://example.com/{source}/{id}"))
}

/// Engine config with millisecond backoff so retry paths finish quickly.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        ..Default::default()
    }
}

/// Build an engine around any grouper.
pub fn build_engine(config: EngineConfig, grouper: Arc<dyn ThematicGrouper>) -> TrendEngine {
    TrendEngine::new(config, grouper).expect("Failed to create engine")
}

/// How a `TableGrouper` misbehaves for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    /// Retryable API error on every call
    Unavailable,
    /// Error that retrying cannot fix
    Misconfigured,
    /// Answer with the last title left out
    DropsTitle,
}

/// Groups titles by a fixed title -> cluster name table.
///
/// Titles missing from the table land in "Other". Per-source failure modes
/// simulate a flaky grouping capability.
pub struct TableGrouper {
    table: HashMap<String, String>,
    failures: HashMap<String, FailMode>,
    calls: Mutex<HashMap<String, u32>>,
}

impl TableGrouper {
    pub fn new(table: &[(&str, &str)]) -> Self {
        Self {
            table: table
                .iter()
                .map(|(title, name)| (merge_key(title), name.to_string()))
                .collect(),
            failures: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Make every call for `source` fail with `mode`.
    pub fn failing(mut self, source: &str, mode: FailMode) -> Self {
        self.failures.insert(source.to_string(), mode);
        self
    }

    /// Number of calls made for one batch.
    pub fn calls(&self, batch: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(batch)
            .copied()
            .unwrap_or(0)
    }

    /// Total calls across all batches.
    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ThematicGrouper for TableGrouper {
    async fn group(
        &self,
        source: &str,
        titles: &[String],
    ) -> Result<Vec<TitleGroup>, GroupingError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(source.to_string())
            .or_insert(0) += 1;

        let titles = match self.failures.get(source) {
            Some(FailMode::Unavailable) => {
                return Err(GroupingError::Api("HTTP 503: unavailable".to_string()))
            }
            Some(FailMode::Misconfigured) => {
                return Err(GroupingError::Config("unknown model".to_string()))
            }
            Some(FailMode::DropsTitle) => &titles[..titles.len().saturating_sub(1)],
            None => titles,
        };

        let mut groups: Vec<TitleGroup> = Vec::new();
        for title in titles {
            let name = self
                .table
                .get(&merge_key(title))
                .cloned()
                .unwrap_or_else(|| "Other".to_string());
            match groups.iter_mut().find(|g| g.cluster_name == name) {
                Some(group) => group.titles.push(title.clone()),
                None => groups.push(TitleGroup::new(name, [title.clone()])),
            }
        }
        Ok(groups)
    }
}

/// Grouper that never answers; only cancellation ends its calls.
pub struct StalledGrouper;

#[async_trait]
impl ThematicGrouper for StalledGrouper {
    async fn group(
        &self,
        _source: &str,
        _titles: &[String],
    ) -> Result<Vec<TitleGroup>, GroupingError> {
        std::future::pending().await
    }
}

/// One week of AI news across three subreddits.
///
/// "Gemini 3" spans every source and dominates engagement, freshness and
/// frequency, so it always ranks first with relevance 100.
pub fn ai_news_posts() -> Vec<Post> {
    vec![
        make_post("ml1", "Gemini 3 tops every benchmark", "MachineLearning", 900, 300, 0),
        make_post("ml2", "Why my RAG pipeline got worse after reranking", "MachineLearning", 40, 12, 9),
        make_post("ml3", "Chunking strategies for RAG", "MachineLearning", 30, 8, 11),
        make_post("ml4", "[D] Weekly paper reading group", "MachineLearning", 5, 2, 13),
        make_post("ll1", "Gemini 3 Pro API pricing announced", "LocalLLaMA", 700, 250, 1),
        make_post("ll2", "Fine-tuning Qwen3 on a single 3090", "LocalLLaMA", 300, 80, 2),
        make_post("ll3", "Qwen3 LoRA results thread", "LocalLLaMA", 250, 60, 3),
        make_post("sg1", "Is Gemini 3 the start of AGI?", "singularity", 800, 400, 0),
        make_post("sg2", "Used GPU prices are dropping", "singularity", 20, 5, 12),
    ]
}

/// Title -> cluster table matching [`ai_news_posts`].
pub fn ai_news_table() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Gemini 3 tops every benchmark", "Gemini 3"),
        ("Gemini 3 Pro API pricing announced", "gemini 3"),
        ("Is Gemini 3 the start of AGI?", "Gemini 3"),
        ("Why my RAG pipeline got worse after reranking", "RAG pipelines"),
        ("Chunking strategies for RAG", "RAG pipelines"),
        ("[D] Weekly paper reading group", "Paper reading"),
        ("Fine-tuning Qwen3 on a single 3090", "Qwen3 fine-tuning"),
        ("Qwen3 LoRA results thread", "Qwen3 fine-tuning"),
        ("Used GPU prices are dropping", "GPU prices"),
    ]
}
