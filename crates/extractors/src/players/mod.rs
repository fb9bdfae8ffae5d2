//! Video-host extractors.
//!
//! A host takes an embed page and produces a direct media URL. Hosts form a
//! closed set selected by [`HostKind`]; the trait exists so the pipeline and
//! tests can hold hosts behind one seam.

mod streamtape;

pub use streamtape::Streamtape;

use std::str::FromStr;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::error::ExtractorError;

/// Supported video hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostKind {
    #[default]
    Streamtape,
}

impl HostKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Streamtape => "Streamtape",
        }
    }

    /// Lowercase substring identifying this host in embed URLs.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Streamtape => "streamtape",
        }
    }

    /// Query parameter the listing site expects to select this host's player.
    pub fn listing_param(&self) -> &'static str {
        match self {
            Self::Streamtape => "host=LECTEUR%20Stape",
        }
    }

    /// Construct the extractor for this host. The client must not follow
    /// redirects, so the host can observe them.
    pub fn new_host(&self, client: Client) -> Box<dyn VideoHost> {
        match self {
            Self::Streamtape => Box::new(Streamtape::new(client)),
        }
    }
}

impl FromStr for HostKind {
    type Err = ExtractorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "streamtape" | "stape" => Ok(Self::Streamtape),
            other => Err(ExtractorError::UnsupportedHost(other.to_string())),
        }
    }
}

/// A video host that can turn an embed page into a direct media URL.
#[async_trait]
pub trait VideoHost: Send + Sync {
    fn kind(&self) -> HostKind;

    /// Whether `url` points at this host's player.
    fn matches(&self, url: &str) -> bool {
        url.to_ascii_lowercase().contains(self.kind().marker())
    }

    /// Reconstruct the redirect-candidate URL hidden in the embed markup.
    fn resolve_markup(&self, markup: &str) -> Result<String, ExtractorError>;

    /// Resolve the embed page at `player_url` into a direct media URL,
    /// polling the host until the link is ready. `referer` is the episode
    /// page that embedded the player; hosts refuse requests without it.
    async fn resolve_media_url(
        &self,
        player_url: &str,
        referer: &str,
        token: &CancellationToken,
    ) -> Result<String, ExtractorError>;
}
