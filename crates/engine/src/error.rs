use reqwest::StatusCode;
use thiserror::Error;

/// Failure taxonomy for the transfer side.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{operation} failed with HTTP {status} for {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer ended early: expected {expected} bytes, wrote {written}")]
    TransferIncomplete { expected: u64, written: u64 },
}

impl DownloadError {
    pub(crate) fn http_status(status: StatusCode, url: &str, operation: &'static str) -> Self {
        Self::HttpStatus {
            status,
            url: url.to_string(),
            operation,
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled => false,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Network(_) | Self::Io(_) | Self::TransferIncomplete { .. } => true,
        }
    }
}
