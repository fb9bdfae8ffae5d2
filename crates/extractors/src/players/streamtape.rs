//! Streamtape host extractor.
//!
//! The embed page assembles its download link in an inline script: a literal
//! prefix concatenated with `substring(n)` of a second literal. Reassembling
//! those pieces yields a URL that answers with a redirect to the media file
//! once the host has the video ready, or with an HTML page while it is still
//! preparing it.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use reqwest::header::{LOCATION, REFERER};
use reqwest::{Client, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{HostKind, VideoHost};
use crate::error::ExtractorError;
use crate::http::fetch_page;

/// Matches the `botlink` assignment: a quoted prefix plus a quoted token with
/// a numeric `substring` offset.
static OBFUSCATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"document\.getElementById\('botlink'\)\.innerHTML\s*=\s*['"](.*?)['"]\s*\+\s*\(['"]([^'"]+)['"]\)\.substring\(\s*(\d+)\s*\)"#,
    )
    .unwrap()
});

const BASE_URL: &str = "https://streamtape.com";

/// Give up on a link after this many not-ready responses.
const READY_POLL_LIMIT: u32 = 6;
const READY_POLL_DELAY: Duration = Duration::from_secs(5);

/// How much of a not-ready body to inspect for the expiry marker.
const BODY_PROBE_LIMIT: usize = 16 * 1024;
const EXPIRED_MARKER: &str = "expired";

pub struct Streamtape {
    client: Client,
    poll_limit: u32,
    poll_delay: Duration,
}

impl Streamtape {
    /// `client` must not follow redirects; the redirect target is the result.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            poll_limit: READY_POLL_LIMIT,
            poll_delay: READY_POLL_DELAY,
        }
    }

    /// Override the not-ready polling ceiling and inter-poll delay.
    pub fn with_polling(mut self, limit: u32, delay: Duration) -> Self {
        self.poll_limit = limit;
        self.poll_delay = delay;
        self
    }

    /// One poll of the candidate URL. `Ok(Some(url))` is the media URL,
    /// `Ok(None)` means the video is not ready yet.
    async fn poll_redirect(
        &self,
        candidate: &str,
        referer: &str,
    ) -> Result<Option<String>, ExtractorError> {
        let response = self
            .client
            .get(candidate)
            .header(REFERER, referer)
            .send()
            .await?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| ExtractorError::MissingLocation {
                    url: candidate.to_string(),
                })?;
            return Ok(Some(location.to_string()));
        }

        if status != StatusCode::OK {
            return Err(ExtractorError::HttpStatus {
                status,
                url: candidate.to_string(),
            });
        }

        // 200 with a page body: either still preparing, or permanently gone.
        let body = read_body_prefix(response, BODY_PROBE_LIMIT).await?;
        if body.to_ascii_lowercase().contains(EXPIRED_MARKER) {
            return Err(ExtractorError::Expired);
        }
        Ok(None)
    }
}

/// Read at most `limit` bytes of the body, lossily decoded. A body that dies
/// mid-stream is a network failure, not a not-ready page.
async fn read_body_prefix(response: Response, limit: usize) -> Result<String, ExtractorError> {
    let mut collected = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        collected.extend_from_slice(&chunk);
        if collected.len() >= limit {
            collected.truncate(limit);
            break;
        }
    }
    Ok(String::from_utf8_lossy(&collected).into_owned())
}

/// Normalize a reassembled fragment into an absolute URL.
fn normalize_fragment(fragment: &str) -> String {
    if let Some(rest) = fragment.strip_prefix("//") {
        format!("https://{rest}")
    } else if fragment.starts_with("http://") || fragment.starts_with("https://") {
        fragment.to_string()
    } else if fragment.starts_with('/') {
        format!("{BASE_URL}{fragment}")
    } else {
        format!("{BASE_URL}/{fragment}")
    }
}

/// Request the raw stream rather than the player wrapper.
fn with_stream_param(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}stream=1")
}

#[async_trait]
impl VideoHost for Streamtape {
    fn kind(&self) -> HostKind {
        HostKind::Streamtape
    }

    fn resolve_markup(&self, markup: &str) -> Result<String, ExtractorError> {
        let caps = OBFUSCATION_REGEX
            .captures(markup)
            .ok_or(ExtractorError::PatternNotFound)?;

        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let token = caps.get(2).map_or("", |m| m.as_str());
        let offset: usize = caps
            .get(3)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or(ExtractorError::PatternNotFound)?;

        let tail = token.get(offset..).unwrap_or_default();
        let candidate = with_stream_param(&normalize_fragment(&format!("{prefix}{tail}")));
        debug!(candidate = %candidate, "reassembled redirect candidate");
        Ok(candidate)
    }

    async fn resolve_media_url(
        &self,
        player_url: &str,
        referer: &str,
        token: &CancellationToken,
    ) -> Result<String, ExtractorError> {
        let markup = fetch_page(&self.client, player_url, Some(referer)).await?;
        let candidate = self.resolve_markup(&markup)?;

        for attempt in 0..self.poll_limit {
            if token.is_cancelled() {
                return Err(ExtractorError::Cancelled);
            }
            if attempt > 0 {
                tokio::select! {
                    _ = token.cancelled() => return Err(ExtractorError::Cancelled),
                    _ = tokio::time::sleep(self.poll_delay) => {}
                }
            }

            if let Some(media_url) = self.poll_redirect(&candidate, player_url).await? {
                info!(attempt, "media url resolved");
                return Ok(media_url);
            }
            debug!(attempt, "video not ready yet");
        }

        Err(ExtractorError::NeverReady {
            attempts: self.poll_limit,
        })
    }
}
