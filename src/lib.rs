use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::*;

use crate::config::PlayerConfig;
use crate::headless::{HeadlessChrome, HeadlessScreen, HttpFrameHost, NoDetailView, NoticeLog, WatchLog};
use crate::metadata::{NoMetadata, TmdbClient};
use crate::surface::MetadataClient;

pub mod config;
pub mod headless;
pub mod metadata;
pub mod models;
pub mod player;
pub mod sources;
pub mod surface;

mod error;
mod http_util;
mod routes;
mod utils;

#[cfg(test)]
mod testing;

pub use player::{Collaborators, Player};
pub use routes::AppState;

/// A player whose frames are plain http requests, for running without a browser,
/// along with the log of its notices.
pub fn headless_player(
    config: PlayerConfig,
    tmdb_api_key: Option<String>,
) -> anyhow::Result<AppState> {
    let metadata: Arc<dyn MetadataClient> = match tmdb_api_key {
        Some(api_key) if !api_key.is_empty() => Arc::new(TmdbClient::new(api_key)),
        _ => {
            warn!("No TMDB api key, titles and trailers won't be looked up");
            Arc::new(NoMetadata)
        }
    };
    let notices = Arc::new(NoticeLog::new());
    let collaborators = Collaborators {
        frames: Arc::new(HttpFrameHost::new()),
        chrome: Arc::new(HeadlessChrome::new()),
        screen: Arc::new(HeadlessScreen::new()),
        notifier: notices.clone(),
        metadata,
        watch_history: Arc::new(WatchLog::new()),
        detail_view: Arc::new(NoDetailView),
    };
    let player = Player::new(config, collaborators)?;
    Ok(AppState { player, notices })
}

pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let address = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening for http requests at '{address}'");

    state.player.schedule_pretest();
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Couldn't bind to {address}"))?;
    axum::serve(listener, routes::router(state))
        .await
        .context("Starting embed player server failed")
}
