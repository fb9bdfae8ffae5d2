//! Remote file probing and file-name selection.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, REFERER};
use tracing::debug;
use url::Url;

use crate::error::DownloadError;

/// What a HEAD request told us about the remote file.
#[derive(Debug, Clone)]
pub struct RemoteProbe {
    /// Advertised size; `None` when the server omits it or reports zero.
    pub size: Option<u64>,
    /// File name suggested via `Content-Disposition`.
    pub suggested_name: Option<String>,
    /// URL after any redirects; transfers go here directly.
    pub final_url: String,
}

/// HEAD the media URL to learn its size and suggested name.
pub async fn probe(
    client: &Client,
    url: &str,
    referer: Option<&str>,
) -> Result<RemoteProbe, DownloadError> {
    let mut request = client.head(url);
    if let Some(referer) = referer {
        request = request.header(REFERER, referer);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::http_status(status, url, "probe"));
    }

    let size = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|size| *size > 0);

    let suggested_name = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(content_disposition_filename);

    let final_url = response.url().to_string();
    debug!(url = %final_url, size = ?size, name = ?suggested_name, "probed remote file");

    Ok(RemoteProbe {
        size,
        suggested_name,
        final_url,
    })
}

/// Pull a file name out of a `Content-Disposition` header value.
fn content_disposition_filename(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("filename=")?;
    let name = rest
        .split(';')
        .next()
        .unwrap_or(rest)
        .trim()
        .trim_matches('"')
        .trim_matches('\'');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Pick the on-disk file name: explicit override, then the server's
/// suggestion, then the URL path, then a timestamped fallback.
pub fn resolve_file_name(probe: &RemoteProbe, explicit: Option<&str>) -> String {
    if let Some(name) = explicit.filter(|name| !name.is_empty()) {
        return name.to_string();
    }
    if let Some(name) = &probe.suggested_name {
        return name.clone();
    }
    if let Some(name) = url_path_filename(&probe.final_url) {
        return name;
    }

    let unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("video_{unix}.mp4")
}

/// Last non-empty path segment of the URL, when it looks like a file name.
fn url_path_filename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()?;
    if !segment.contains('.') {
        return None;
    }
    Some(segment.to_string())
}
