use thiserror::Error;

use vodfetch_engine::DownloadError;
use vodfetch_extractors::ExtractorError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Extractor(#[from] ExtractorError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("no episodes found at {0}")]
    NothingToDownload(String),

    #[error("every episode failed")]
    AllEpisodesFailed,
}
