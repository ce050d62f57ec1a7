use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::*;

use crate::sources::{CacheScope, EmbedSource};

const CACHE_TTL_SECS: u64 = 10 * 60;

/// The Shawshank Redemption, reachable on pretty much every provider.
const PRETEST_MOVIE_ID: u64 = 278;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    pub sources: Vec<EmbedSource>,
    #[serde(default)]
    pub timings: Timings,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub cache_scope: CacheScope,
    #[serde(default = "default_pretest_movie")]
    pub pretest_movie_id: u64,
}

/// Every value is in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Timings {
    pub probe_timeout: u64,
    pub selection_grace: u64,
    pub quick_probe_timeout: u64,
    pub load_confirm_timeout: u64,
    pub controls_timeout: u64,
    pub pretest_delay: u64,
    pub pretest_timeout: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            probe_timeout: 5000,
            selection_grace: 2000,
            quick_probe_timeout: 4000,
            load_confirm_timeout: 8000,
            controls_timeout: 3000,
            pretest_delay: 5000,
            pretest_timeout: 6000,
        }
    }
}

impl Timings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout)
    }

    /// Upper bound of a whole selection, no matter how the probes behave.
    pub fn selection_deadline(&self) -> Duration {
        Duration::from_millis(self.probe_timeout.saturating_add(self.selection_grace))
    }

    pub fn quick_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.quick_probe_timeout)
    }

    pub fn load_confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.load_confirm_timeout)
    }

    pub fn controls_timeout(&self) -> Duration {
        Duration::from_millis(self.controls_timeout)
    }

    pub fn pretest_delay(&self) -> Duration {
        Duration::from_millis(self.pretest_delay)
    }

    pub fn pretest_timeout(&self) -> Duration {
        Duration::from_millis(self.pretest_timeout)
    }
}

fn default_cache_ttl() -> u64 {
    CACHE_TTL_SECS
}

fn default_pretest_movie() -> u64 {
    PRETEST_MOVIE_ID
}

impl PlayerConfig {
    pub fn new(sources: Vec<EmbedSource>) -> Self {
        PlayerConfig {
            sources,
            timings: Timings::default(),
            cache_ttl_secs: CACHE_TTL_SECS,
            cache_scope: CacheScope::default(),
            pretest_movie_id: PRETEST_MOVIE_ID,
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        info!("Loading player config from {path:?}");
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Couldn't read player config {path:?}"))?;
        let config = serde_json::from_str::<PlayerConfig>(&content)
            .with_context(|| format!("Couldn't parse player config {path:?}"))?;
        config.validate()?;
        debug!(
            "Loaded {} embed sources, cache scope: {:?}",
            config.sources.len(),
            config.cache_scope
        );
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sources.is_empty() {
            bail!("At least one embed source must be configured");
        }
        for source in &self.sources {
            source
                .validate()
                .with_context(|| format!("Embed source '{}' is invalid", source.name))?;
        }
        if self.timings.probe_timeout == 0 || self.timings.load_confirm_timeout == 0 {
            bail!("Probe and load confirmation timeouts must be positive");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
