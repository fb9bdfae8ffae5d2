mod cli;
mod error;
mod progress;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use vodfetch_engine::progress as engine_progress;
use vodfetch_engine::{Coordinator, Downloader, EngineConfig, RetryPolicy};
use vodfetch_extractors::http::create_client;
use vodfetch_extractors::{ResolutionPipeline, site_for_url};

use crate::cli::Args;
use crate::error::{CliError, Result};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet);

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight writes");
            cancel.cancel();
        }
    });

    let page_client = create_client(true)?;
    let follower_client = create_client(false)?;
    let site = site_for_url(&args.url, page_client, args.host)?;
    let host = args.host.new_host(follower_client);
    let pipeline = ResolutionPipeline::new(site, host);

    let mut episodes = pipeline.discover(&args.url).await?;
    if episodes.is_empty() {
        // Not a listing page; treat the URL as a single episode page.
        info!("no episode links found, treating url as an episode page");
        episodes = vec![pipeline.site().episode_from_page_url(&args.url)];
    }
    if let Some(start) = args.start {
        episodes.retain(|episode| episode.number >= start);
    }
    if episodes.is_empty() {
        return Err(CliError::NothingToDownload(args.url));
    }
    info!(count = episodes.len(), "episodes queued");

    let target_dir = output_dir(args.output.as_deref(), &args.url);
    let config = EngineConfig {
        retry: RetryPolicy {
            max_retries: args.retries,
            ..RetryPolicy::default()
        },
        ..EngineConfig::default()
    };
    let downloader = Downloader::new(config)?;
    let coordinator = Coordinator::new(pipeline, downloader, args.concurrency);

    let (progress_tx, progress_rx) = engine_progress::channel();
    let renderer = progress::spawn_renderer(progress_rx);

    let outcomes = coordinator
        .run(episodes, target_dir, Some(progress_tx), token)
        .await;
    // All senders are gone once the batch is over; the renderer drains and
    // exits on its own.
    let _ = renderer.await;

    let mut succeeded = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(file) if file.skipped => {
                succeeded += 1;
                println!("{}: already downloaded", outcome.episode.display_name);
            }
            Ok(file) => {
                succeeded += 1;
                println!(
                    "{}: saved to {}",
                    outcome.episode.display_name,
                    file.path.display()
                );
            }
            Err(err) => {
                println!("{}: failed ({err})", outcome.episode.display_name);
            }
        }
    }
    println!("{succeeded}/{} episodes downloaded", outcomes.len());

    if succeeded == 0 {
        return Err(CliError::AllEpisodesFailed);
    }
    Ok(())
}

/// Explicit `--output`, else a directory named after the last URL path
/// segment, else `downloads`.
fn output_dir(explicit: Option<&str>, series_url: &str) -> PathBuf {
    if let Some(dir) = explicit {
        return PathBuf::from(dir);
    }

    let slug = url::Url::parse(series_url).ok().and_then(|parsed| {
        parsed
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .next_back()
            .map(ToOwned::to_owned)
    });

    match slug {
        Some(slug) => PathBuf::from(slug),
        None => PathBuf::from("downloads"),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}
