use anyhow::{anyhow, Context};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::Instant;
use tracing::*;

use crate::http_util::http_client;
use crate::models::{MediaDetails, MediaType};
use crate::surface::MetadataClient;

pub const TMDB_API: &str = "https://api.themoviedb.org/3";

pub struct TmdbClient {
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, TMDB_API)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        TmdbClient {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    async fn fetch(&self, media_type: MediaType, id: u64) -> anyhow::Result<MediaDetails> {
        let start = Instant::now();
        let url = format!("{}/{}/{id}", self.base_url, media_type.as_str());
        let details = http_client()
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("append_to_response", "videos"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<MediaDetails>()
            .await
            .with_context(|| format!("Couldn't parse details of {url}"))?;
        debug!(
            "Fetched details of {} {id} in {:?}",
            media_type.as_str(),
            start.elapsed()
        );
        Ok(details)
    }
}

impl MetadataClient for TmdbClient {
    fn details(&self, media_type: MediaType, id: u64) -> BoxFuture<'_, anyhow::Result<MediaDetails>> {
        self.fetch(media_type, id).boxed()
    }
}

/// Used when no api key is configured; every lookup fails and callers fall back.
pub struct NoMetadata;

impl MetadataClient for NoMetadata {
    fn details(&self, media_type: MediaType, id: u64) -> BoxFuture<'_, anyhow::Result<MediaDetails>> {
        async move {
            Err(anyhow!(
                "No metadata api configured, can't look up {} {id}",
                media_type.as_str()
            ))
        }
        .boxed()
    }
}
