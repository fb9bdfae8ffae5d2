//! Listing-site extractors.
//!
//! Each supported listing site is one [`SeriesSite`] variant; selection
//! happens by URL through the static registry rather than structural typing.

mod voiranime;

pub use voiranime::VoirAnime;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use crate::error::ExtractorError;
use crate::players::HostKind;

/// One episode discovered on a series listing page.
///
/// Identity is `number` within the series. Numbers come from a numeric token
/// in the URL slug and may collide; colliding episodes are both kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub number: u32,
    pub display_name: String,
    pub url: String,
}

/// A listing site that can enumerate a series and point at the embedded
/// player of a single episode.
#[async_trait]
pub trait SeriesSite: Send + Sync {
    fn name(&self) -> &'static str;

    /// Discover the ordered episode list of a series.
    ///
    /// An empty list means the page is not a series listing; callers use
    /// emptiness, not an error, to disambiguate.
    async fn discover_episodes(&self, series_url: &str) -> Result<Vec<Episode>, ExtractorError>;

    /// Extract the embedded player URL for the selected host from one episode
    /// page. `None` means the markup lacks the expected embed, distinct from
    /// a network failure.
    async fn locate_player(&self, episode: &Episode) -> Result<Option<String>, ExtractorError>;

    /// Interpret a single episode page URL as an [`Episode`], for direct
    /// episode-URL input.
    fn episode_from_page_url(&self, url: &str) -> Episode;
}

type SiteConstructor = fn(Client, HostKind) -> Box<dyn SeriesSite>;

struct SiteEntry {
    regex: &'static LazyLock<Regex>,
    constructor: SiteConstructor,
}

// Static site registry.
static SITES: &[SiteEntry] = &[SiteEntry {
    regex: &voiranime::URL_REGEX,
    constructor: |client, host| Box::new(VoirAnime::new(client, host)),
}];

/// Create the site extractor responsible for `url`.
pub fn site_for_url(
    url: &str,
    client: Client,
    host: HostKind,
) -> Result<Box<dyn SeriesSite>, ExtractorError> {
    for site in SITES {
        if site.regex.is_match(url) {
            return Ok((site.constructor)(client, host));
        }
    }
    Err(ExtractorError::UnsupportedSite(url.to_string()))
}
