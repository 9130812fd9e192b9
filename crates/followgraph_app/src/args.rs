use std::path::PathBuf;

use clap::Parser;
use followgraph_core::RESULT_LIMIT;
use log::LevelFilter;

/// Suggest accounts to follow on Mastodon from the people you already follow.
#[derive(Parser, Debug)]
#[command(name = "followgraph", version)]
pub struct Args {
    /// Your fediverse handle, e.g. `gabi@mastodon.online`.
    pub handle: String,

    /// RON settings file; a missing file falls back to defaults.
    #[arg(long, env = "FOLLOWGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory to write the ranked list to as JSON.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of suggestions to print.
    #[arg(short, long, default_value_t = RESULT_LIMIT)]
    pub limit: usize,

    #[arg(long, default_value = "warn", env = "FOLLOWGRAPH_LOG")]
    pub log_level: LevelFilter,

    /// Also write the log to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
