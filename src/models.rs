use std::fmt::{Display, Formatter};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

/// A playable item, as understood by the embed providers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Media {
    Movie { id: u64 },
    Tv { id: u64, season: u32, episode: u32 },
}

impl Media {
    pub fn movie(id: u64) -> Self {
        Media::Movie { id }
    }

    /// Missing or zero season/episode numbers fall back to the first episode.
    pub fn episode(id: u64, season: Option<u32>, episode: Option<u32>) -> Self {
        Media::Tv {
            id,
            season: season.filter(|&s| s > 0).unwrap_or(1),
            episode: episode.filter(|&e| e > 0).unwrap_or(1),
        }
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            Media::Movie { .. } => MediaType::Movie,
            Media::Tv { .. } => MediaType::Tv,
        }
    }

    pub fn id(&self) -> u64 {
        match *self {
            Media::Movie { id } | Media::Tv { id, .. } => id,
        }
    }
}

impl Display for Media {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Media::Movie { id } => write!(f, "movie {id}"),
            Media::Tv {
                id,
                season,
                episode,
            } => write!(f, "tv {id} S{season}:E{episode}"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    #[default]
    Idle,
    Selecting,
    Loading,
    Playing,
    Switching,
}

impl PlayerState {
    pub fn is_active(&self) -> bool {
        *self != PlayerState::Idle
    }
}

impl Display for PlayerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            PlayerState::Idle => "idle",
            PlayerState::Selecting => "selecting",
            PlayerState::Loading => "loading",
            PlayerState::Playing => "playing",
            PlayerState::Switching => "switching",
        };
        write!(f, "{state}")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaySession {
    pub media: Media,
    pub current_index: usize,
    pub started_at: DateTime<Local>,
    #[serde(skip)]
    pub(crate) ticket: u64,
}

impl PlaySession {
    pub(crate) fn new(media: Media, ticket: u64) -> Self {
        PlaySession {
            media,
            current_index: 0,
            started_at: Local::now(),
            ticket,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MediaDetails {
    pub title: Option<String>,
    pub name: Option<String>,
    pub original_name: Option<String>,
    #[serde(default)]
    pub videos: Option<VideoList>,
}

impl MediaDetails {
    pub fn videos(&self) -> &[VideoEntry] {
        self.videos
            .as_ref()
            .map(|v| v.results.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VideoList {
    #[serde(default)]
    pub results: Vec<VideoEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VideoEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub site: String,
    #[serde(default)]
    pub official: bool,
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub state: PlayerState,
    pub session: Option<PlaySession>,
    pub source: Option<String>,
    pub embed_mounted: bool,
    pub fullscreen: bool,
    pub trailer_open: bool,
}
