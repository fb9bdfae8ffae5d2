use clap::Parser;

use vodfetch_extractors::HostKind;

#[derive(Parser, Debug)]
#[command(
    name = "vodfetch",
    about = "Batch-download series episodes through chained link resolution",
    version
)]
pub struct Args {
    /// Series listing URL, or a single episode page URL
    pub url: String,

    /// Directory to write files into (defaults to a directory named after
    /// the series)
    #[arg(short, long)]
    pub output: Option<String>,

    /// First episode number to download; earlier episodes are skipped
    #[arg(short, long)]
    pub start: Option<u32>,

    /// How many episodes to process at once
    #[arg(short, long, default_value_t = 3)]
    pub concurrency: usize,

    /// Video host to resolve players through
    #[arg(long, default_value = "streamtape")]
    pub host: HostKind,

    /// Retries per failed download
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log errors only
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
