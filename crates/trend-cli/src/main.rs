//! Trend Radar
//!
//! Groups discussion posts into topic clusters and surfaces the trending ones.
//!
//! # Usage
//!
//! ```bash
//! trend-radar rank --input posts.json [--output report.json] [--mode per-source|global]
//! trend-radar elbow 90 85 20 15 10
//! trend-radar config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/trend-radar/config.toml)
//! 3. Environment variables (TREND_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use trend_cli::{run_elbow, run_rank, show_config, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rank(args) => {
            run_rank(cli.config.as_deref(), cli.log_level.as_deref(), args).await?;
        }
        Commands::Elbow { scores } => {
            run_elbow(cli.config.as_deref(), cli.log_level.as_deref(), scores)?;
        }
        Commands::Config => {
            show_config(cli.config.as_deref(), cli.log_level.as_deref())?;
        }
    }

    Ok(())
}
