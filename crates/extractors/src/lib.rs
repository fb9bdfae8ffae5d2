//! # vodfetch-extractors
//!
//! Link-resolution pipeline: a series listing page is turned into an ordered
//! episode list, each episode page into an embedded video-host URL, and each
//! embed page — via a deobfuscation step and the host's computed redirect —
//! into a direct media URL.
//!
//! Listing sites and video hosts are closed sets of variants behind the
//! [`sites::SeriesSite`] and [`players::VideoHost`] traits, selected by
//! configuration rather than structural typing.

pub mod error;
pub mod http;
pub mod pipeline;
pub mod players;
pub mod sites;

pub use error::ExtractorError;
pub use pipeline::{ResolutionPipeline, ResolvedMedia};
pub use players::{HostKind, VideoHost};
pub use sites::{Episode, SeriesSite, site_for_url};
