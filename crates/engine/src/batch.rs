//! Batch coordination: resolve and download many episodes under a
//! concurrency bound, reporting per-episode outcomes in input order.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use vodfetch_extractors::{Episode, ExtractorError, ResolutionPipeline};

use crate::downloader::{DownloadRequest, DownloadedFile, Downloader};
use crate::error::DownloadError;
use crate::progress::ProgressSender;
use crate::retry::{RetryAction, RetryPolicy, retry_with_backoff};

/// Why one episode failed; the batch itself never fails as a whole.
#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error(transparent)]
    Resolution(#[from] ExtractorError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Result of one episode, paired with the episode it belongs to.
#[derive(Debug)]
pub struct BatchOutcome {
    pub episode: Episode,
    pub result: Result<DownloadedFile, EpisodeError>,
}

/// Fans episodes out over a bounded number of workers. One episode's failure
/// never aborts its siblings; cancellation stops everything.
pub struct Coordinator {
    pipeline: Arc<ResolutionPipeline>,
    downloader: Arc<Downloader>,
    concurrency: usize,
    resolve_retry: RetryPolicy,
}

impl Coordinator {
    pub fn new(pipeline: ResolutionPipeline, downloader: Downloader, concurrency: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            downloader: Arc::new(downloader),
            concurrency: concurrency.max(1),
            resolve_retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy applied to transient resolution failures.
    pub fn resolve_retry(mut self, policy: RetryPolicy) -> Self {
        self.resolve_retry = policy;
        self
    }

    /// Process every episode, returning one outcome per input in input order.
    pub async fn run(
        &self,
        episodes: Vec<Episode>,
        target_dir: PathBuf,
        progress: Option<ProgressSender>,
        token: CancellationToken,
    ) -> Vec<BatchOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<(usize, Episode, Result<DownloadedFile, EpisodeError>)> =
            JoinSet::new();

        let file_names = assign_file_names(&episodes);
        for (index, (episode, file_name)) in episodes.into_iter().zip(file_names).enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let pipeline = Arc::clone(&self.pipeline);
            let downloader = Arc::clone(&self.downloader);
            let target_dir = target_dir.clone();
            let progress = progress.clone();
            let token = token.clone();
            let resolve_retry = self.resolve_retry;

            tasks.spawn(async move {
                // Acquire fails only once the semaphore is closed, which we
                // never do; treat it as cancellation.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (
                        index,
                        episode,
                        Err(EpisodeError::Download(DownloadError::Cancelled)),
                    );
                };
                let result = process_episode(
                    &pipeline,
                    &downloader,
                    &episode,
                    file_name,
                    &target_dir,
                    progress.as_ref(),
                    &token,
                    &resolve_retry,
                )
                .await;
                (index, episode, result)
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, episode, result)) => {
                    match &result {
                        Ok(file) if file.skipped => {
                            info!(episode = episode.number, "already downloaded")
                        }
                        Ok(file) => {
                            info!(episode = episode.number, path = %file.path.display(), "episode done")
                        }
                        Err(err) => error!(episode = episode.number, error = %err, "episode failed"),
                    }
                    outcomes.push((index, BatchOutcome { episode, result }));
                }
                Err(join_err) => {
                    // A panicked worker loses its episode; surface it loudly.
                    error!(error = %join_err, "episode task panicked");
                }
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// Per-episode target names. Duplicate numbers get a distinguishing suffix
/// so no two workers ever hold the same path.
fn assign_file_names(episodes: &[Episode]) -> Vec<String> {
    let mut seen: HashMap<u32, u32> = HashMap::new();
    episodes
        .iter()
        .map(|episode| {
            let count = seen
                .entry(episode.number)
                .and_modify(|count| *count += 1)
                .or_insert(1);
            if *count == 1 {
                format!("ep{:02}.mp4", episode.number)
            } else {
                format!("ep{:02}-{count}.mp4", episode.number)
            }
        })
        .collect()
}

async fn process_episode(
    pipeline: &ResolutionPipeline,
    downloader: &Downloader,
    episode: &Episode,
    file_name: String,
    target_dir: &std::path::Path,
    progress: Option<&ProgressSender>,
    token: &CancellationToken,
    resolve_retry: &RetryPolicy,
) -> Result<DownloadedFile, EpisodeError> {
    if token.is_cancelled() {
        return Err(EpisodeError::Resolution(ExtractorError::Cancelled));
    }
    info!(episode = episode.number, name = %episode.display_name, "processing episode");

    let resolved = retry_with_backoff(
        resolve_retry,
        token,
        || EpisodeError::Resolution(ExtractorError::Cancelled),
        |_| async move {
            match pipeline.resolve(episode, token).await {
                Ok(resolved) => RetryAction::Success(resolved),
                Err(err) if err.is_transient() => RetryAction::Retry(EpisodeError::from(err)),
                Err(err) => RetryAction::Fail(EpisodeError::from(err)),
            }
        },
    )
    .await?;

    let request = DownloadRequest {
        media_url: resolved.media_url,
        target_dir: target_dir.to_path_buf(),
        file_name: Some(file_name),
        referer: Some(resolved.player_url),
    };
    let file = downloader.download(&request, progress, token).await?;
    Ok(file)
}
