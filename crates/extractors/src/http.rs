//! HTTP plumbing shared by the site and host extractors.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, redirect};
use tracing::debug;

use crate::error::ExtractorError;

/// Browser user-agent sent on every request; hosts reject default client
/// identifiers.
pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5,fr;q=0.3"),
    );
    headers
}

/// Build a client for page fetches (follows redirects) or for the redirect
/// follower (`follow_redirects = false`, so 3xx responses stay observable).
pub fn create_client(follow_redirects: bool) -> Result<Client, ExtractorError> {
    let policy = if follow_redirects {
        redirect::Policy::limited(10)
    } else {
        redirect::Policy::none()
    };

    Client::builder()
        .user_agent(DEFAULT_UA)
        .default_headers(default_headers())
        .redirect(policy)
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(ExtractorError::from)
}

/// Fetch a page body as text, failing on non-success statuses.
pub async fn fetch_page(
    client: &Client,
    url: &str,
    referer: Option<&str>,
) -> Result<String, ExtractorError> {
    debug!(url = %url, "fetching page");

    let mut request = client.get(url);
    if let Some(referer) = referer {
        request = request.header(reqwest::header::REFERER, referer);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExtractorError::HttpStatus {
            status,
            url: url.to_string(),
        });
    }

    Ok(response.text().await?)
}
