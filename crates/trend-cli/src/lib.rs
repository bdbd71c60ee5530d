//! trend-radar library exports.
//!
//! This crate provides the command-line front end of the trend engine.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (rank, elbow, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, GrouperArg, ModeArg, RankArgs};
pub use commands::{
    apply_rank_overrides, build_grouper, compute_elbow, format_summary, load_posts,
    load_settings, render_config, run_elbow, run_rank, show_config, write_report, ElbowOutput,
};
