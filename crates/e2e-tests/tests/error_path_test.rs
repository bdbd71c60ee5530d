//! End-to-end error path tests for trend-radar.
//!
//! Bad configuration and bad input are rejected before any grouping call.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{fast_config, TableGrouper, TestHarness};
use trend_cli::load_posts;
use trend_engine::TrendEngine;
use trend_types::{EngineConfig, ScoringWeights, TrendError};

/// Weights that do not sum to one are rejected at construction.
#[test]
fn test_invalid_weights_rejected() {
    let config = EngineConfig {
        weights: ScoringWeights::new(0.5, 0.5, 0.5),
        ..fast_config()
    };

    let result = TrendEngine::new(config, Arc::new(TableGrouper::new(&[])));

    match result {
        Err(TrendError::InvalidConfig(message)) => {
            assert!(message.contains("weights"), "Unexpected message: {message}");
        }
        Err(other) => panic!("Expected InvalidConfig, got {other}"),
        Ok(_) => panic!("Invalid weights must be rejected"),
    }
}

/// Zero concurrency and zero freshness window are rejected.
#[test]
fn test_zero_limits_rejected() {
    for config in [
        EngineConfig {
            max_concurrency: 0,
            ..fast_config()
        },
        EngineConfig {
            freshness_window_days: 0,
            ..fast_config()
        },
        EngineConfig {
            call_timeout_secs: 0,
            ..fast_config()
        },
    ] {
        assert!(
            TrendEngine::new(config, Arc::new(TableGrouper::new(&[]))).is_err(),
            "Zero limit must be rejected"
        );
    }
}

/// A posts file that is not JSON fails with the file path in the error.
#[test]
fn test_malformed_posts_file() {
    let harness = TestHarness::new();
    harness.write_raw("{ this is not json");

    let err = load_posts(&harness.posts_path).unwrap_err();
    assert!(
        format!("{err:#}").contains("posts.json"),
        "Error should name the file: {err:#}"
    );
}

/// A missing posts file is an error, not an empty run.
#[test]
fn test_missing_posts_file() {
    let harness = TestHarness::new();
    assert!(load_posts(&harness.posts_path).is_err());
}

/// Posts without a timestamp are rejected.
#[test]
fn test_post_without_timestamp_rejected() {
    let harness = TestHarness::new();
    harness.write_raw(r#"[{"id": "1", "title": "Gemini 3", "source": "ai"}]"#);

    assert!(load_posts(&harness.posts_path).is_err());
}

/// Wrapped files and forum export field names are accepted.
#[test]
fn test_wrapped_file_with_export_aliases() {
    let harness = TestHarness::new();
    harness.write_raw(
        r#"{
            "posts": [
                {
                    "id": "abc",
                    "title": "Gemini 3 launch",
                    "subreddit": "MachineLearning",
                    "created_utc": "2025-11-19T08:30:00Z",
                    "score": 120,
                    "comments": 45,
                    "selftext": "Benchmarks inside"
                }
            ]
        }"#,
    );

    let posts = load_posts(&harness.posts_path).unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].source, "MachineLearning");
    assert_eq!(posts[0].num_comments, 45);
    assert_eq!(posts[0].body.as_deref(), Some("Benchmarks inside"));
    assert_eq!(posts[0].created_at.to_rfc3339(), "2025-11-19T08:30:00+00:00");
}

/// Collector output: naive UTC timestamps and `ups`/`downs` vote fields.
#[test]
fn test_collector_file_with_naive_timestamps() {
    let harness = TestHarness::new();
    harness.write_raw(
        r#"[
            {
                "id": "1gx2abc",
                "title": "Gemini 3 tops every benchmark",
                "selftext": "",
                "score": 5,
                "ups": 7,
                "downs": 2,
                "comments": 3,
                "created_utc": "2025-11-19 08:30:00",
                "subreddit": "MachineLearning",
                "url": "https://www.reddit.com/r/MachineLearning/comments/1gx2abc/"
            },
            {
                "id": "1gx2abd",
                "title": "Qwen3 fine-tuning notes",
                "score": 12,
                "created_utc": "2025-11-18T21:05:00",
                "subreddit": "LocalLLaMA"
            }
        ]"#,
    );

    let posts = load_posts(&harness.posts_path).unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!((posts[0].upvotes, posts[0].downvotes), (7, 2));
    assert_eq!(posts[0].created_at.to_rfc3339(), "2025-11-19T08:30:00+00:00");
    assert_eq!(posts[1].created_at.to_rfc3339(), "2025-11-18T21:05:00+00:00");
}
