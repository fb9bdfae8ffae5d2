//! End-to-end resolution: series URL → episodes → player embed → media URL.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ExtractorError;
use crate::players::VideoHost;
use crate::sites::{Episode, SeriesSite};

/// Outcome of resolving one episode all the way down to a direct media URL.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    /// Direct, fetchable media URL.
    pub media_url: String,
    /// The player page the media URL was resolved from; downloads send it as
    /// the referer.
    pub player_url: String,
}

/// Pairs a listing site with a video host and walks the chain of
/// indirections between them.
pub struct ResolutionPipeline {
    site: Box<dyn SeriesSite>,
    host: Box<dyn VideoHost>,
}

impl ResolutionPipeline {
    pub fn new(site: Box<dyn SeriesSite>, host: Box<dyn VideoHost>) -> Self {
        Self { site, host }
    }

    pub fn site(&self) -> &dyn SeriesSite {
        self.site.as_ref()
    }

    /// Enumerate the episodes of a series listing.
    pub async fn discover(&self, series_url: &str) -> Result<Vec<Episode>, ExtractorError> {
        let episodes = self.site.discover_episodes(series_url).await?;
        info!(
            site = self.site.name(),
            count = episodes.len(),
            "discovered episodes"
        );
        Ok(episodes)
    }

    /// Resolve one episode to a direct media URL.
    pub async fn resolve(
        &self,
        episode: &Episode,
        token: &CancellationToken,
    ) -> Result<ResolvedMedia, ExtractorError> {
        if token.is_cancelled() {
            return Err(ExtractorError::Cancelled);
        }

        let player_url = self
            .site
            .locate_player(episode)
            .await?
            .filter(|url| self.host.matches(url))
            .ok_or(ExtractorError::PlayerNotFound {
                host: self.host.kind().name(),
            })?;
        debug!(episode = episode.number, player_url = %player_url, "player located");

        let media_url = self
            .host
            .resolve_media_url(&player_url, &episode.url, token)
            .await?;

        Ok(ResolvedMedia {
            media_url,
            player_url,
        })
    }
}
