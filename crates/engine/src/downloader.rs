//! Resumable single-file downloads.
//!
//! Each download probes the remote file, compares it against what is already
//! on disk, and picks a [`TransferPlan`]: skip, resume with a ranged request,
//! or start fresh. A server that ignores the range and answers 200 resets the
//! transfer to a fresh one by truncating the local file.

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use reqwest::header::{RANGE, REFERER};
use reqwest::{Client, StatusCode};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::DownloadError;
use crate::probe::{self, resolve_file_name};
use crate::progress::{ProgressEvent, ProgressSender};
use crate::retry::{RetryAction, retry_with_backoff};

/// How an individual transfer should proceed given local and remote sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPlan {
    /// Download from byte zero, truncating anything local.
    Fresh,
    /// Request `bytes={offset}-` and append.
    Resume { offset: u64 },
    /// Local file already holds the full remote size.
    Complete,
}

/// Resume only when the local file is a proper, non-empty prefix of a
/// known remote size. Everything ambiguous restarts from zero.
pub fn plan_transfer(local: Option<u64>, remote: Option<u64>) -> TransferPlan {
    let Some(local) = local else {
        return TransferPlan::Fresh;
    };
    let Some(remote) = remote else {
        return TransferPlan::Fresh;
    };
    if local == remote {
        return TransferPlan::Complete;
    }
    if local == 0 || local > remote {
        return TransferPlan::Fresh;
    }
    TransferPlan::Resume { offset: local }
}

/// One file to fetch.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub media_url: String,
    pub target_dir: PathBuf,
    /// Overrides server- and URL-derived names when set.
    pub file_name: Option<String>,
    pub referer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub path: PathBuf,
    /// True when the file was already complete and no bytes moved.
    pub skipped: bool,
}

pub struct Downloader {
    client: Client,
    config: EngineConfig,
}

impl Downloader {
    pub fn new(config: EngineConfig) -> Result<Self, DownloadError> {
        let client = config.create_client()?;
        Ok(Self { client, config })
    }

    pub fn with_client(client: Client, config: EngineConfig) -> Self {
        Self { client, config }
    }

    /// Download one file, retrying retryable failures per the configured
    /// policy. Every attempt re-probes, so a partial previous attempt turns
    /// into a resume.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        progress: Option<&ProgressSender>,
        token: &CancellationToken,
    ) -> Result<DownloadedFile, DownloadError> {
        retry_with_backoff(
            &self.config.retry,
            token,
            || DownloadError::Cancelled,
            |_| async move {
                match self.attempt(request, progress, token).await {
                    Ok(file) => RetryAction::Success(file),
                    Err(err) if err.is_retryable() => RetryAction::Retry(err),
                    Err(err) => RetryAction::Fail(err),
                }
            },
        )
        .await
    }

    async fn attempt(
        &self,
        request: &DownloadRequest,
        progress: Option<&ProgressSender>,
        token: &CancellationToken,
    ) -> Result<DownloadedFile, DownloadError> {
        let remote = probe::probe(&self.client, &request.media_url, request.referer.as_deref()).await?;
        let file_name = resolve_file_name(&remote, request.file_name.as_deref());
        let path = request.target_dir.join(&file_name);

        let local_size = match fs::metadata(&path).await {
            Ok(meta) => Some(meta.len()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        let plan = plan_transfer(local_size, remote.size);
        debug!(path = %path.display(), ?plan, local = ?local_size, remote = ?remote.size, "planned transfer");

        match plan {
            TransferPlan::Complete => {
                info!(path = %path.display(), "file already complete, skipping");
                return Ok(DownloadedFile {
                    path,
                    skipped: true,
                });
            }
            TransferPlan::Fresh => {
                if local_size.is_some_and(|size| size > 0) {
                    warn!(path = %path.display(), "local file unusable, starting over");
                    fs::remove_file(&path).await?;
                }
            }
            TransferPlan::Resume { offset } => {
                info!(path = %path.display(), offset, "resuming partial download");
            }
        }

        fs::create_dir_all(&request.target_dir).await?;

        let offset = match plan {
            TransferPlan::Resume { offset } => offset,
            _ => 0,
        };
        self.transfer(request, &remote, &path, offset, progress, token)
            .await?;

        Ok(DownloadedFile {
            path,
            skipped: false,
        })
    }

    async fn transfer(
        &self,
        request: &DownloadRequest,
        remote: &probe::RemoteProbe,
        path: &std::path::Path,
        mut offset: u64,
        progress: Option<&ProgressSender>,
        token: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let mut get = self.client.get(&remote.final_url);
        if let Some(referer) = &request.referer {
            get = get.header(REFERER, referer);
        }
        if offset > 0 {
            get = get.header(RANGE, format!("bytes={offset}-"));
        }

        let response = get.send().await?;
        let status = response.status();
        match status {
            StatusCode::PARTIAL_CONTENT => {}
            StatusCode::OK => {
                // Server ignored the range; the full body follows.
                if offset > 0 {
                    warn!(url = %remote.final_url, "range not honored, restarting from zero");
                    offset = 0;
                }
            }
            _ => return Err(DownloadError::http_status(status, &remote.final_url, "transfer")),
        }

        // Ignored when the probe advertised no size.
        let expected = remote.size.map(|total| total - offset);

        let file = if offset > 0 {
            OpenOptions::new().append(true).open(path).await?
        } else {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .await?
        };
        let mut writer = BufWriter::with_capacity(self.config.write_buffer_size, file);

        let file_label: Arc<str> = Arc::from(
            path.file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("download"),
        );
        if let Some(progress) = progress {
            let _ = progress.send(ProgressEvent::Started {
                file: Arc::clone(&file_label),
                total: remote.size,
                resumed_from: offset,
            });
        }

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        let result = loop {
            tokio::select! {
                _ = token.cancelled() => break Err(DownloadError::Cancelled),
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        writer.write_all(&bytes).await?;
                        written += bytes.len() as u64;
                        if let Some(progress) = progress {
                            let _ = progress.send(ProgressEvent::Transferred {
                                file: Arc::clone(&file_label),
                                bytes: offset + written,
                            });
                        }
                    }
                    Some(Err(err)) => break Err(err.into()),
                    None => break Ok(()),
                },
            }
        };

        // Keep whatever made it to disk so the next attempt can resume.
        writer.flush().await?;
        result?;

        if let Some(expected) = expected
            && written != expected
        {
            return Err(DownloadError::TransferIncomplete { expected, written });
        }

        if let Some(progress) = progress {
            let _ = progress.send(ProgressEvent::Finished { file: file_label });
        }
        info!(path = %path.display(), bytes = offset + written, "download finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sizes_start_fresh() {
        assert_eq!(plan_transfer(None, Some(100)), TransferPlan::Fresh);
        assert_eq!(plan_transfer(Some(50), None), TransferPlan::Fresh);
        assert_eq!(plan_transfer(None, None), TransferPlan::Fresh);
    }

    #[test]
    fn matching_sizes_skip() {
        assert_eq!(plan_transfer(Some(100), Some(100)), TransferPlan::Complete);
    }

    #[test]
    fn proper_prefix_resumes() {
        assert_eq!(
            plan_transfer(Some(40), Some(100)),
            TransferPlan::Resume { offset: 40 }
        );
    }

    #[test]
    fn empty_or_oversized_local_files_restart() {
        assert_eq!(plan_transfer(Some(0), Some(100)), TransferPlan::Fresh);
        assert_eq!(plan_transfer(Some(150), Some(100)), TransferPlan::Fresh);
    }
}
