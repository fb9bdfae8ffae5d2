use reqwest::StatusCode;
use thiserror::Error;

/// Failure taxonomy for the resolution side.
///
/// The first four variants are the per-episode fatal conditions: the markup no
/// longer matches what we parse ([`PatternNotFound`](Self::PatternNotFound),
/// [`PlayerNotFound`](Self::PlayerNotFound)) or the host explicitly gave up on
/// the link ([`Expired`](Self::Expired), [`NeverReady`](Self::NeverReady)).
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("obfuscation pattern not found in player page")]
    PatternNotFound,

    #[error("no player embed found for host `{host}`")]
    PlayerNotFound { host: &'static str },

    #[error("host reports the link expired")]
    Expired,

    #[error("video never became ready after {attempts} polls")]
    NeverReady { attempts: u32 },

    #[error("redirect response missing Location header for {url}")]
    MissingLocation { url: String },

    #[error("unsupported host `{0}`")]
    UnsupportedHost(String),

    #[error("no site extractor matches url `{0}`")]
    UnsupportedSite(String),

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("extraction cancelled")]
    Cancelled,
}

impl ExtractorError {
    /// Transient failures may be retried by the caller's shared retry loop;
    /// everything else is fatal for the episode.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
