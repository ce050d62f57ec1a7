//! Capabilities the player needs from whatever hosts it.
//!
//! The player never looks anything up by id; it is handed these at construction
//! and only ever mounts frames, sets text and toggles classes through them.

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::models::{MediaDetails, MediaType};

pub const PLAYER_PERMISSIONS: &str =
    "autoplay; fullscreen; encrypted-media; picture-in-picture; gyroscope; accelerometer";

pub const TRAILER_PERMISSIONS: &str = "autoplay; fullscreen; encrypted-media";

pub mod class {
    pub const ACTIVE: &str = "active";
    pub const NO_SCROLL: &str = "no-scroll";
    pub const SHOW_CONTROLS: &str = "show-controls";
    pub const HIDDEN: &str = "hidden";
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FrameId(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// Invisible, non-interactive, used only to find out whether a url loads.
    Offscreen,
    Player,
    Trailer,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSpec {
    pub url: String,
    pub kind: FrameKind,
    pub allow: Option<&'static str>,
    pub allow_fullscreen: bool,
    /// Always false for embeds, sandboxing breaks most third-party players.
    pub sandboxed: bool,
}

impl FrameSpec {
    pub fn offscreen(url: impl Into<String>) -> Self {
        FrameSpec {
            url: url.into(),
            kind: FrameKind::Offscreen,
            allow: None,
            allow_fullscreen: false,
            sandboxed: false,
        }
    }

    pub fn player(url: impl Into<String>) -> Self {
        FrameSpec {
            url: url.into(),
            kind: FrameKind::Player,
            allow: Some(PLAYER_PERMISSIONS),
            allow_fullscreen: true,
            sandboxed: false,
        }
    }

    pub fn trailer(url: impl Into<String>) -> Self {
        FrameSpec {
            url: url.into(),
            kind: FrameKind::Trailer,
            allow: Some(TRAILER_PERMISSIONS),
            allow_fullscreen: true,
            sandboxed: false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSignal {
    Loaded,
    Failed,
}

pub struct MountedFrame {
    pub id: FrameId,
    /// Settles once, with whichever of load or error the host saw first.
    pub signal: oneshot::Receiver<LoadSignal>,
}

/// Mounts and unmounts happen while the player holds its state lock, so a host
/// must never call back into the player from either.
pub trait FrameHost: Send + Sync {
    fn mount(&self, spec: FrameSpec) -> anyhow::Result<MountedFrame>;

    /// Unknown or already removed ids are ignored.
    fn unmount(&self, id: FrameId);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Overlay,
    Container,
    Loading,
    ClickZone,
    Page,
    TrailerModal,
    TrailerContainer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSlot {
    Title,
    SourceName,
    FullscreenButton,
}

pub trait PlayerChrome: Send + Sync {
    fn has(&self, element: Element) -> bool;

    fn set_text(&self, slot: TextSlot, text: &str);

    fn set_class(&self, element: Element, class: &str, enabled: bool);

    fn has_class(&self, element: Element, class: &str) -> bool;
}

pub trait Screen: Send + Sync {
    fn is_fullscreen(&self) -> bool;

    fn enter_fullscreen(&self, element: Element) -> anyhow::Result<()>;

    fn exit_fullscreen(&self) -> anyhow::Result<()>;

    fn lock_landscape(&self) -> anyhow::Result<()>;

    fn unlock_orientation(&self) -> anyhow::Result<()>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, level: NoticeLevel);
}

pub trait MetadataClient: Send + Sync {
    fn details(&self, media_type: MediaType, id: u64) -> BoxFuture<'_, anyhow::Result<MediaDetails>>;
}

pub trait WatchHistory: Send + Sync {
    fn mark_movie_watched(&self, id: u64);

    fn mark_episode_watched(&self, id: u64, season: u32, episode: u32);
}

/// The show detail view that lists episodes with their watched state.
pub trait DetailView: Send + Sync {
    fn is_open(&self) -> bool;

    fn reload_episodes(&self, show_id: u64);
}
