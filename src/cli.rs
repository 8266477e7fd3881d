use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "slack-threads")]
#[command(about = "Fetch Slack messages and their thread replies, grouped by thread")]
pub struct Cli {
    /// Channel names (or user ids for direct messages) to fetch
    #[arg(required = true, value_name = "CHANNELS")]
    pub channels: Vec<String>,

    /// End date for message retrieval (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    pub end_date: Option<String>,

    /// Number of days to look back from the end date [default: 7]
    #[arg(short, long)]
    pub duration: Option<u32>,

    /// Print every thread of every channel
    #[arg(short, long)]
    pub verbose: bool,

    /// Maximum number of concurrent channel fetches and thread fetches
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Settings file, defaults to ./settings.toml when present
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
