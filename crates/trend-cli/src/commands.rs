//! Command implementations for trend-radar.
//!
//! Handles:
//! - rank: load posts, group, score, write the report
//! - elbow: knee point detection over ad-hoc scores
//! - config: print effective settings

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use trend_engine::{ElbowSelection, ElbowSelector, TrendEngine};
use trend_grouping::{ApiGrouper, ApiGrouperConfig, KeywordGrouper, ThematicGrouper};
use trend_types::{GrouperProvider, GrouperSettings, Post, Report, Settings};

use crate::cli::{GrouperArg, RankArgs};

/// Env vars consulted when no API key is configured.
const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Load settings and apply the global CLI overrides.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Apply rank flags on top of loaded settings.
pub fn apply_rank_overrides(settings: &mut Settings, args: &RankArgs) {
    if let Some(mode) = args.mode {
        settings.engine.clustering_mode = mode.into();
    }
    if let Some(days) = args.window_days {
        settings.engine.freshness_window_days = days;
    }
    if let Some(concurrency) = args.concurrency {
        settings.engine.max_concurrency = concurrency;
    }
    if args.no_elbow {
        settings.engine.apply_elbow = false;
    }
    match args.grouper {
        Some(GrouperArg::Keyword) => settings.grouper.provider = GrouperProvider::Keyword,
        Some(GrouperArg::Api) if settings.grouper.provider == GrouperProvider::Keyword => {
            settings.grouper.provider = GrouperProvider::OpenAi;
        }
        _ => {}
    }
}

/// Install the global tracing subscriber (stderr, RUST_LOG wins).
fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Build the configured grouping backend.
///
/// Falls back to OPENAI_API_KEY / ANTHROPIC_API_KEY when no key is set.
pub fn build_grouper(settings: &GrouperSettings) -> Result<Arc<dyn ThematicGrouper>> {
    let key_var = match settings.provider {
        GrouperProvider::Keyword => return Ok(Arc::new(KeywordGrouper::new())),
        GrouperProvider::OpenAi => OPENAI_KEY_VAR,
        GrouperProvider::Anthropic => ANTHROPIC_KEY_VAR,
    };

    let mut settings = settings.clone();
    if settings.api_key.is_none() {
        settings.api_key = std::env::var(key_var).ok();
    }

    let config = ApiGrouperConfig::from_settings(&settings)
        .with_context(|| format!("Grouper not configured (set grouper.api_key or {key_var})"))?;
    let grouper = ApiGrouper::new(config).context("Failed to create API grouper")?;
    Ok(Arc::new(grouper))
}

/// Accepted shapes of the posts file.
#[derive(Deserialize)]
#[serde(untagged)]
enum PostsFile {
    List(Vec<Post>),
    Wrapped { posts: Vec<Post> },
}

/// Read posts from a JSON file.
pub fn load_posts(path: &Path) -> Result<Vec<Post>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read posts file {}", path.display()))?;
    let file: PostsFile = serde_json::from_str(&text)
        .with_context(|| format!("Invalid posts file {}", path.display()))?;
    Ok(match file {
        PostsFile::List(posts) | PostsFile::Wrapped { posts } => posts,
    })
}

/// Write the report as pretty JSON to a file or stdout.
pub fn write_report(report: &Report, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Wrote report to {:?}", path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

/// Human-readable ranking summary.
pub fn format_summary(report: &Report, top: usize) -> String {
    let mut lines = vec![format!(
        "{} clusters ranked, {} selected (threshold {}), {} posts from {} sources",
        report.summary.total_clusters_before_filtering,
        report.summary.total_clusters_after_filtering,
        report
            .elbow_threshold
            .map(|t| format!("{t:.2}"))
            .unwrap_or_else(|| "n/a".to_string()),
        report.summary.total_posts_considered,
        report.summary.sources_total,
    )];

    for cluster in report.selected.iter().take(top) {
        lines.push(format!(
            "{:>3}. {:<50} relevance {:>6.2}  posts {:>3}  sources {}",
            cluster.rank,
            cluster.cluster.name,
            cluster.relevance(),
            cluster.metrics.raw_frequency,
            cluster.cluster.sources.len(),
        ));
    }

    for excluded in &report.excluded_sources {
        lines.push(format!(
            "excluded {} ({}, {} attempts): {}",
            excluded.source, excluded.failure, excluded.attempts, excluded.message
        ));
    }

    lines.join("\n")
}

/// Resolves once Ctrl+C or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling run...");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling run...");
        }
    }
}

/// Rank trending clusters from a posts file.
///
/// 1. Load configuration (defaults -> file -> env -> CLI)
/// 2. Load posts and build the grouper
/// 3. Run the engine; Ctrl+C cancels pending grouping calls
/// 4. Write the report and print a summary to stderr
pub async fn run_rank(
    config_path: Option<&str>,
    log_level: Option<&str>,
    args: RankArgs,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level)?;
    apply_rank_overrides(&mut settings, &args);
    init_logging(&settings.log_level)?;

    let posts = load_posts(&args.input)?;
    info!(posts = posts.len(), input = ?args.input, "Loaded posts");

    let grouper = build_grouper(&settings.grouper)?;
    let engine = TrendEngine::new(settings.engine.clone(), grouper)
        .context("Invalid engine configuration")?;

    let reference_time = args.reference_time.unwrap_or_else(Utc::now);

    let cancel = CancellationToken::new();
    let signal_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            cancel.cancel();
        })
    };

    let report = engine.run(posts, reference_time, cancel.clone()).await;
    signal_task.abort();

    write_report(&report, args.output.as_deref())?;
    eprintln!("{}", format_summary(&report, args.top));

    if cancel.is_cancelled() {
        bail!("Run cancelled; report is partial");
    }
    Ok(())
}

/// Elbow command output.
#[derive(Debug, Serialize)]
pub struct ElbowOutput {
    /// Input scores sorted descending
    pub scores: Vec<f64>,
    pub selection: ElbowSelection,
    pub retained: Vec<f64>,
}

/// Run elbow detection over ad-hoc scores.
pub fn compute_elbow(mut scores: Vec<f64>, min_points: usize) -> ElbowOutput {
    scores.sort_by(|a, b| b.total_cmp(a));
    let selection = ElbowSelector::new(true, min_points).select(&scores);
    let retained = scores[..selection.retained].to_vec();
    ElbowOutput {
        scores,
        selection,
        retained,
    }
}

/// Print elbow detection results as JSON.
pub fn run_elbow(config_path: Option<&str>, log_level: Option<&str>, scores: Vec<f64>) -> Result<()> {
    let settings = load_settings(config_path, log_level)?;
    init_logging(&settings.log_level)?;

    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        bail!("Scores must be finite, got {bad}");
    }

    let output = compute_elbow(scores, settings.engine.min_clusters_for_elbow);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Render settings as TOML, noting a configured API key without showing it.
pub fn render_config(settings: &Settings) -> Result<String> {
    let mut rendered = toml::to_string_pretty(settings).context("Failed to render settings")?;
    if settings.grouper.api_key.is_some() {
        rendered.push_str("\n# grouper.api_key is set (redacted)\n");
    }
    Ok(rendered)
}

/// Print the effective configuration.
pub fn show_config(config_path: Option<&str>, log_level: Option<&str>) -> Result<()> {
    let settings = load_settings(config_path, log_level)?;
    settings
        .engine
        .validate()
        .context("Configuration is invalid")?;
    print!("{}", render_config(&settings)?);
    Ok(())
}
