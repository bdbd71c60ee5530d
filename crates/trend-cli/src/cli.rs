//! CLI argument parsing for trend-radar.
//!
//! CLI flags override every other config source.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use trend_types::ClusteringMode;

/// Trend Radar
///
/// Groups discussion posts into topic clusters and surfaces the trending ones.
#[derive(Parser, Debug)]
#[command(name = "trend-radar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/trend-radar/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank trending topic clusters from a posts file
    Rank(RankArgs),

    /// Run elbow detection over a list of scores
    Elbow {
        /// Scores in any order
        #[arg(required = true, allow_negative_numbers = true)]
        scores: Vec<f64>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Arguments of the rank command
#[derive(Args, Debug, Clone)]
pub struct RankArgs {
    /// JSON file holding an array of posts (or {"posts": [...]})
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Clustering mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Grouping backend
    #[arg(short, long, value_enum)]
    pub grouper: Option<GrouperArg>,

    /// Reference time for freshness decay (RFC 3339, default now)
    #[arg(long)]
    pub reference_time: Option<DateTime<Utc>>,

    /// Override the freshness window (days)
    #[arg(long)]
    pub window_days: Option<u32>,

    /// Override the number of concurrent grouping calls
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Keep every cluster instead of cutting at the elbow
    #[arg(long)]
    pub no_elbow: bool,

    /// Number of clusters listed in the summary
    #[arg(long, default_value = "10")]
    pub top: usize,
}

/// Clustering mode flag values
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// One grouping call per source
    PerSource,
    /// One grouping call over every source
    Global,
}

impl From<ModeArg> for ClusteringMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::PerSource => ClusteringMode::PerSource,
            ModeArg::Global => ClusteringMode::Global,
        }
    }
}

/// Grouping backend flag values
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrouperArg {
    /// Configured LLM endpoint
    Api,
    /// Offline keyword grouping
    Keyword,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
