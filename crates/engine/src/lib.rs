//! # vodfetch-engine
//!
//! Resumable HTTP download engine plus the batch coordinator that fans a
//! resolved episode list out over bounded concurrency.
//!
//! The engine probes the remote file, compares it against whatever already
//! exists locally, and either skips, resumes with a ranged request, or starts
//! fresh. Transfers report progress over a channel and honor cancellation at
//! chunk granularity.

pub mod batch;
pub mod config;
pub mod downloader;
pub mod error;
pub mod probe;
pub mod progress;
pub mod retry;

pub use batch::{BatchOutcome, Coordinator, EpisodeError};
pub use config::EngineConfig;
pub use downloader::{DownloadRequest, DownloadedFile, Downloader, TransferPlan};
pub use error::DownloadError;
pub use probe::{RemoteProbe, resolve_file_name};
pub use progress::{ProgressEvent, ProgressSender};
pub use retry::RetryPolicy;
