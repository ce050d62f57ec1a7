use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::*;

use crate::models::Media;

/// What a cached source choice is keyed by.
///
/// `Title` reuses one choice for every episode of a show, providers rarely differ
/// in reachability between episodes. `Episode` keys tv choices per episode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    #[default]
    Title,
    Episode,
}

impl CacheScope {
    pub fn key(&self, media: &Media) -> String {
        match (self, media) {
            (
                CacheScope::Episode,
                Media::Tv {
                    id,
                    season,
                    episode,
                },
            ) => format!("tv_{id}_s{season}e{episode}"),
            _ => format!("{}_{}", media.media_type().as_str(), media.id()),
        }
    }
}

#[derive(Debug)]
struct CachedChoice {
    index: usize,
    chosen_at: Instant,
}

/// Winners of previous selections, each valid for `ttl` after it was chosen.
#[derive(Debug)]
pub struct ProbeCache {
    ttl: Duration,
    entries: DashMap<String, CachedChoice>,
}

impl ProbeCache {
    pub fn new(ttl: Duration) -> Self {
        ProbeCache {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        let fresh = match self.entries.get(key) {
            Some(cached) if cached.chosen_at.elapsed() < self.ttl => Some(cached.index),
            Some(_) => None,
            None => return None,
        };
        if let Some(index) = fresh {
            debug!("Cache hit: {key} => {index}");
            return Some(index);
        }
        debug!("Cached source for {key} expired");
        self.entries
            .remove_if(key, |_, cached| cached.chosen_at.elapsed() >= self.ttl);
        None
    }

    pub fn put(&self, key: String, index: usize) {
        debug!("Caching source {index} for {key}");
        self.entries.insert(
            key,
            CachedChoice {
                index,
                chosen_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
