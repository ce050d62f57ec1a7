use std::sync::Arc;

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::Media;

pub mod cache;
pub mod probe;
pub mod selector;

pub use cache::{CacheScope, ProbeCache};
pub use probe::Prober;
pub use selector::SourceSelector;

/// A third-party site serving a playable iframe for a movie or an episode.
///
/// `movie` and `tv` are url templates, `{id}`, `{season}` and `{episode}` get
/// replaced with the requested media.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EmbedSource {
    pub name: String,
    pub movie: String,
    pub tv: String,
}

impl EmbedSource {
    pub fn new(name: impl Into<String>, movie: impl Into<String>, tv: impl Into<String>) -> Self {
        EmbedSource {
            name: name.into(),
            movie: movie.into(),
            tv: tv.into(),
        }
    }

    pub fn movie_url(&self, id: u64) -> String {
        self.movie.replace("{id}", &id.to_string())
    }

    pub fn tv_url(&self, id: u64, season: u32, episode: u32) -> String {
        self.tv
            .replace("{id}", &id.to_string())
            .replace("{season}", &season.to_string())
            .replace("{episode}", &episode.to_string())
    }

    pub fn url_for(&self, media: &Media) -> String {
        match *media {
            Media::Movie { id } => self.movie_url(id),
            Media::Tv {
                id,
                season,
                episode,
            } => self.tv_url(id, season, episode),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            bail!("Source name is empty");
        }
        for url in [self.movie_url(1), self.tv_url(1, 1, 1)] {
            Url::parse(&url).map_err(|e| anyhow!("Url not valid: {url}, {e}"))?;
        }
        Ok(())
    }
}

/// Ordered, never empty. The order is the fallback order and index 0 is the default.
#[derive(Debug, Clone)]
pub struct SourceList(Arc<[EmbedSource]>);

impl SourceList {
    pub fn new(sources: Vec<EmbedSource>) -> anyhow::Result<Self> {
        if sources.is_empty() {
            bail!("Embed source list can't be empty");
        }
        Ok(SourceList(sources.into()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Stale or overflowing indices wrap around instead of going out of range.
    pub fn normalize(&self, index: usize) -> usize {
        index % self.0.len()
    }

    pub fn next(&self, index: usize) -> usize {
        (self.normalize(index) + 1) % self.0.len()
    }

    pub fn get(&self, index: usize) -> &EmbedSource {
        &self.0[self.normalize(index)]
    }

    pub fn name(&self, index: usize) -> &str {
        &self.get(index).name
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmbedSource> {
        self.0.iter()
    }
}
