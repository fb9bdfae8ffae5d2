//! VoirAnime listing site.
//!
//! A series page links every episode under the series URL itself; episode
//! numbers live in the URL slug (`.../my-show-07-vf/`). Episode pages embed
//! the active player inside a well-known container element.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use super::{Episode, SeriesSite};
use crate::error::ExtractorError;
use crate::http::fetch_page;
use crate::players::HostKind;

pub static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:[a-z0-9-]+\.)*voiranime\.[a-z]+/").unwrap());

static HREF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).unwrap());

static IFRAME_SRC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<iframe\s[^>]*?src\s*=\s*["']([^"']+)["']"#).unwrap());

/// Container that wraps the active player iframe on an episode page.
const PLAYER_CONTAINER_ID: &str = "chapter-video-frame";

pub struct VoirAnime {
    client: Client,
    host: HostKind,
}

impl VoirAnime {
    pub fn new(client: Client, host: HostKind) -> Self {
        Self { client, host }
    }

    /// Append the query parameter that makes the listing serve the selected
    /// host's player on the episode page.
    fn with_host_param(&self, url: &str) -> String {
        let param = self.host.listing_param();
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{url}{separator}{param}")
    }
}

/// Episode number of a link: the rightmost purely-numeric `-`-separated token
/// of the final path segment. Links without one are not episode links.
fn extract_episode_number(url: &str) -> Option<u32> {
    let trimmed = url.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next()?;
    segment.split('-').rev().find_map(|token| {
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            token.parse().ok()
        } else {
            None
        }
    })
}

/// Collect `(number, url)` pairs for every link prefixed by the
/// trailing-slash-normalized series URL, de-duplicated by exact target and
/// sorted ascending by number. Duplicate numbers are kept.
fn parse_episode_links(markup: &str, series_url: &str) -> Vec<(u32, String)> {
    let base = series_url.trim_end_matches('/');
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut found = Vec::new();

    for caps in HREF_REGEX.captures_iter(markup) {
        let Some(href) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if !href.starts_with(base) || !seen.insert(href) {
            continue;
        }
        if let Some(number) = extract_episode_number(href) {
            found.push((number, href.to_string()));
        }
    }

    found.sort_by_key(|(number, _)| *number);
    found
}

/// Primary strategy: the first iframe at or after the player container.
/// Fallback: any iframe whose src mentions the host marker.
fn find_player_iframe(markup: &str, host_marker: &str) -> Option<String> {
    if let Some(container_at) = markup.find(PLAYER_CONTAINER_ID)
        && let Some(caps) = IFRAME_SRC_REGEX.captures(&markup[container_at..])
        && let Some(src) = caps.get(1).map(|m| m.as_str())
        && !src.is_empty()
    {
        return Some(src.to_string());
    }

    IFRAME_SRC_REGEX
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|src| src.to_ascii_lowercase().contains(host_marker))
        .map(ToOwned::to_owned)
}

#[async_trait]
impl SeriesSite for VoirAnime {
    fn name(&self) -> &'static str {
        "VoirAnime"
    }

    async fn discover_episodes(&self, series_url: &str) -> Result<Vec<Episode>, ExtractorError> {
        let markup = fetch_page(&self.client, series_url, None).await?;
        let links = parse_episode_links(&markup, series_url);
        debug!(series_url = %series_url, count = links.len(), "parsed episode links");

        Ok(links
            .into_iter()
            .map(|(number, url)| Episode {
                number,
                display_name: format!("Episode {number}"),
                url: self.with_host_param(&url),
            })
            .collect())
    }

    async fn locate_player(&self, episode: &Episode) -> Result<Option<String>, ExtractorError> {
        let markup = fetch_page(&self.client, &episode.url, None).await?;
        let player = find_player_iframe(&markup, self.host.marker());
        if player.is_none() {
            warn!(
                episode = episode.number,
                host = self.host.name(),
                "no player iframe found"
            );
        }
        Ok(player)
    }

    fn episode_from_page_url(&self, url: &str) -> Episode {
        let number = extract_episode_number(url).unwrap_or(0);
        Episode {
            number,
            display_name: format!("Episode {number}"),
            url: self.with_host_param(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIES: &str = "https://voiranime.example/anime/my-show/";

    fn listing(links: &[&str]) -> String {
        let mut page = String::from("<html><body><nav><a href=\"/genres/\">Genres</a></nav>");
        for link in links {
            page.push_str(&format!("<a class=\"ep\" href=\"{link}\">ep</a>"));
        }
        page.push_str("</body></html>");
        page
    }

    #[test]
    fn episodes_sorted_by_number_with_urls_preserved() {
        let page = listing(&[
            "https://voiranime.example/anime/my-show/my-show-7-vf/",
            "https://voiranime.example/anime/my-show/my-show-2-vf/",
            "https://voiranime.example/anime/my-show/my-show-10-vf/",
        ]);
        let links = parse_episode_links(&page, SERIES);
        assert_eq!(
            links,
            vec![
                (
                    2,
                    "https://voiranime.example/anime/my-show/my-show-2-vf/".to_string()
                ),
                (
                    7,
                    "https://voiranime.example/anime/my-show/my-show-7-vf/".to_string()
                ),
                (
                    10,
                    "https://voiranime.example/anime/my-show/my-show-10-vf/".to_string()
                ),
            ]
        );
    }

    #[test]
    fn links_without_numeric_token_are_excluded() {
        let page = listing(&[
            "https://voiranime.example/anime/my-show/my-show-3-vf/",
            "https://voiranime.example/anime/my-show/extras/",
        ]);
        let links = parse_episode_links(&page, SERIES);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].0, 3);
    }

    #[test]
    fn exact_duplicate_targets_are_deduplicated() {
        let page = listing(&[
            "https://voiranime.example/anime/my-show/my-show-1-vf/",
            "https://voiranime.example/anime/my-show/my-show-1-vf/",
        ]);
        let links = parse_episode_links(&page, SERIES);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn distinct_urls_with_same_number_are_both_kept() {
        let page = listing(&[
            "https://voiranime.example/anime/my-show/my-show-1-vf/",
            "https://voiranime.example/anime/my-show/my-show-1-vostfr/",
        ]);
        let links = parse_episode_links(&page, SERIES);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].0, 1);
        assert_eq!(links[1].0, 1);
    }

    #[test]
    fn links_outside_the_series_are_ignored() {
        let page = listing(&["https://voiranime.example/anime/other-show/other-show-1-vf/"]);
        assert!(parse_episode_links(&page, SERIES).is_empty());
    }

    #[test]
    fn number_comes_from_rightmost_numeric_token() {
        assert_eq!(
            extract_episode_number("https://x.example/anime/show-2/show-2-14-vf/"),
            Some(14)
        );
        assert_eq!(extract_episode_number("https://x.example/show-5-vf"), Some(5));
        assert_eq!(extract_episode_number("https://x.example/show-vf/"), None);
    }

    #[test]
    fn host_param_appended_with_correct_separator() {
        let site = VoirAnime::new(Client::new(), HostKind::Streamtape);
        assert_eq!(
            site.with_host_param("https://voiranime.example/a/"),
            "https://voiranime.example/a/?host=LECTEUR%20Stape"
        );
        assert_eq!(
            site.with_host_param("https://voiranime.example/a/?x=1"),
            "https://voiranime.example/a/?x=1&host=LECTEUR%20Stape"
        );
    }

    #[test]
    fn player_iframe_found_inside_container() {
        let page = r#"
            <div id="chapter-video-frame">
                <iframe src="https://streamtape.example/e/abc"></iframe>
            </div>
            <iframe src="https://other.example/e/zzz"></iframe>
        "#;
        assert_eq!(
            find_player_iframe(page, "streamtape"),
            Some("https://streamtape.example/e/abc".to_string())
        );
    }

    #[test]
    fn player_iframe_fallback_scans_for_host_marker() {
        let page = r#"
            <iframe src="https://ads.example/banner"></iframe>
            <iframe src="https://STREAMTAPE.example/e/abc"></iframe>
        "#;
        assert_eq!(
            find_player_iframe(page, "streamtape"),
            Some("https://STREAMTAPE.example/e/abc".to_string())
        );
    }

    #[test]
    fn player_iframe_absent() {
        let page = "<html><body><p>no player here</p></body></html>";
        assert_eq!(find_player_iframe(page, "streamtape"), None);
    }
}
