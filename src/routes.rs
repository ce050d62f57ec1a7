use std::sync::Arc;

use anyhow::anyhow;
use axum::extract::{FromRef, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::error::HttpError;
use crate::headless::{Notice, NoticeLog};
use crate::models::{Media, MediaType, PlayerSnapshot, VideoEntry};
use crate::player::Player;

const DEFAULT_NOTICES: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub player: Player,
    pub notices: Arc<NoticeLog>,
}

impl FromRef<AppState> for Player {
    fn from_ref(state: &AppState) -> Self {
        state.player.clone()
    }
}

impl FromRef<AppState> for Arc<NoticeLog> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.notices)
    }
}

#[derive(Debug, Deserialize)]
struct NoticeQuery {
    count: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SourceInfo {
    index: usize,
    name: String,
    reachable: Option<bool>,
}

pub fn router(app: AppState) -> Router {
    Router::new()
        .route("/play/movie/:id", post(play_movie))
        .route("/play/tv/:id/:season/:episode", post(play_episode))
        .route("/switch", post(switch_source))
        .route("/smart-switch", post(smart_switch))
        .route("/close", post(close))
        .route("/fullscreen", post(toggle_fullscreen))
        .route("/activity", post(activity))
        .route("/key/:key", post(key))
        .route("/trailer/close", post(close_trailer))
        .route("/trailer/:media_type/:id", post(play_trailer))
        .route("/state", get(state))
        .route("/sources", get(sources))
        .route("/notices", get(notices))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn play_movie(
    State(player): State<Player>,
    Path(id): Path<u64>,
) -> Result<Json<PlayerSnapshot>, HttpError> {
    player.play(Media::movie(id)).await?;
    Ok(Json(player.snapshot()))
}

async fn play_episode(
    State(player): State<Player>,
    Path((id, season, episode)): Path<(u64, u32, u32)>,
) -> Result<Json<PlayerSnapshot>, HttpError> {
    player
        .play(Media::episode(id, Some(season), Some(episode)))
        .await?;
    Ok(Json(player.snapshot()))
}

async fn switch_source(State(player): State<Player>) -> Result<Json<PlayerSnapshot>, HttpError> {
    player
        .switch_source()
        .ok_or_else(|| HttpError::conflict(anyhow!("Nothing is playing")))?;
    Ok(Json(player.snapshot()))
}

async fn smart_switch(State(player): State<Player>) -> Result<Json<PlayerSnapshot>, HttpError> {
    player
        .smart_switch()
        .await
        .ok_or_else(|| HttpError::conflict(anyhow!("Nothing is playing")))?;
    Ok(Json(player.snapshot()))
}

async fn close(State(player): State<Player>) -> Json<PlayerSnapshot> {
    player.close();
    Json(player.snapshot())
}

async fn toggle_fullscreen(State(player): State<Player>) -> Json<Value> {
    Json(json!({ "fullscreen": player.toggle_fullscreen() }))
}

async fn activity(State(player): State<Player>) -> Json<Value> {
    player.on_activity();
    Json(json!({ "ok": true }))
}

async fn key(State(player): State<Player>, Path(key): Path<String>) -> Json<Value> {
    Json(json!({ "handled": player.handle_key(&key).await }))
}

async fn play_trailer(
    State(player): State<Player>,
    Path((media_type, id)): Path<(MediaType, u64)>,
) -> Json<Option<VideoEntry>> {
    Json(player.play_trailer(media_type, id).await)
}

async fn close_trailer(State(player): State<Player>) -> Json<Value> {
    player.close_trailer();
    Json(json!({ "ok": true }))
}

async fn state(State(player): State<Player>) -> Json<PlayerSnapshot> {
    Json(player.snapshot())
}

async fn sources(State(player): State<Player>) -> Json<Vec<SourceInfo>> {
    let reachability = player.selector().reachability();
    let sources = player
        .sources()
        .iter()
        .zip(reachability)
        .enumerate()
        .map(|(index, (source, reachable))| SourceInfo {
            index,
            name: source.name.clone(),
            reachable,
        })
        .collect();
    Json(sources)
}

async fn notices(
    State(notices): State<Arc<NoticeLog>>,
    Query(query): Query<NoticeQuery>,
) -> Json<Vec<Notice>> {
    Json(notices.recent(query.count.unwrap_or(DEFAULT_NOTICES)))
}
