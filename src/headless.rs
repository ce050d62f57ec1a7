//! In-process hosts for the player when there's no browser around it.
//!
//! Frames are plain http requests, chrome and screen just remember what they were
//! told so it can be inspected, notices end up in the log.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use chrono::{DateTime, Local};
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::*;
use url::Url;

use crate::http_util::http_client;
use crate::models::Media;
use crate::surface::{
    DetailView, Element, FrameHost, FrameId, FrameKind, FrameSpec, LoadSignal, MountedFrame,
    NoticeLevel, Notifier, PlayerChrome, Screen, TextSlot, WatchHistory,
};

const MAX_NOTICES: usize = 100;

/// Loads a frame by requesting its url, any successful response counts as loaded.
#[derive(Default)]
pub struct HttpFrameHost {
    next_id: AtomicU64,
    frames: DashMap<FrameId, LiveFrame>,
}

struct LiveFrame {
    spec: FrameSpec,
    request: JoinHandle<()>,
}

impl HttpFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mounted(&self, kind: FrameKind) -> Vec<String> {
        self.frames
            .iter()
            .filter(|frame| frame.spec.kind == kind)
            .map(|frame| frame.spec.url.clone())
            .collect()
    }
}

impl FrameHost for HttpFrameHost {
    fn mount(&self, spec: FrameSpec) -> anyhow::Result<MountedFrame> {
        let url = Url::parse(&spec.url).with_context(|| format!("Url not valid: {}", spec.url))?;
        let id = FrameId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, signal) = oneshot::channel();
        let request = tokio::spawn(async move {
            let signal = match http_client()
                .get(url.clone())
                .send()
                .await
                .and_then(|res| res.error_for_status())
            {
                Ok(res) => {
                    debug!("{url} answered with {}", res.status());
                    LoadSignal::Loaded
                }
                Err(e) => {
                    debug!("{url} failed to load: {e}");
                    LoadSignal::Failed
                }
            };
            sender.send(signal).ok();
        });
        debug!("Mounted {:?} frame {id:?} => {}", spec.kind, spec.url);
        self.frames.insert(id, LiveFrame { spec, request });
        Ok(MountedFrame { id, signal })
    }

    fn unmount(&self, id: FrameId) {
        if let Some((_, frame)) = self.frames.remove(&id) {
            frame.request.abort();
            debug!("Unmounted {:?} frame {id:?}", frame.spec.kind);
        }
    }
}

/// Remembers texts and classes; elements listed as missing are simply absent.
#[derive(Default)]
pub struct HeadlessChrome {
    missing: HashSet<Element>,
    texts: DashMap<TextSlot, String>,
    classes: DashMap<Element, HashSet<String>>,
}

impl HeadlessChrome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without(elements: impl IntoIterator<Item = Element>) -> Self {
        HeadlessChrome {
            missing: elements.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn text(&self, slot: TextSlot) -> Option<String> {
        self.texts.get(&slot).map(|text| text.clone())
    }
}

impl PlayerChrome for HeadlessChrome {
    fn has(&self, element: Element) -> bool {
        !self.missing.contains(&element)
    }

    fn set_text(&self, slot: TextSlot, text: &str) {
        trace!("{slot:?} => {text}");
        self.texts.insert(slot, text.to_owned());
    }

    fn set_class(&self, element: Element, class: &str, enabled: bool) {
        if !self.has(element) {
            return;
        }
        let mut classes = self.classes.entry(element).or_default();
        if enabled {
            classes.insert(class.to_owned());
        } else {
            classes.remove(class);
        }
    }

    fn has_class(&self, element: Element, class: &str) -> bool {
        self.classes
            .get(&element)
            .map(|classes| classes.contains(class))
            .unwrap_or(false)
    }
}

#[derive(Default)]
pub struct HeadlessScreen {
    fullscreen: AtomicBool,
    landscape_locked: AtomicBool,
}

impl HeadlessScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_landscape_locked(&self) -> bool {
        self.landscape_locked.load(Ordering::Relaxed)
    }
}

impl Screen for HeadlessScreen {
    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::Relaxed)
    }

    fn enter_fullscreen(&self, element: Element) -> anyhow::Result<()> {
        debug!("Entering fullscreen with {element:?}");
        self.fullscreen.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn exit_fullscreen(&self) -> anyhow::Result<()> {
        self.fullscreen.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn lock_landscape(&self) -> anyhow::Result<()> {
        self.landscape_locked.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn unlock_orientation(&self) -> anyhow::Result<()> {
        self.landscape_locked.store(false, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    pub at: DateTime<Local>,
}

/// Logs every notice and keeps the most recent ones around.
#[derive(Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recent(&self, count: usize) -> Vec<Notice> {
        let notices = self.lock();
        notices[notices.len().saturating_sub(count)..].to_vec()
    }

    pub fn messages(&self) -> Vec<(NoticeLevel, String)> {
        self.lock()
            .iter()
            .map(|notice| (notice.level, notice.message.clone()))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notice>> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, message: &str, level: NoticeLevel) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => info!("[{level:?}] {message}"),
            NoticeLevel::Warning => warn!("{message}"),
            NoticeLevel::Error => error!("{message}"),
        }
        let mut notices = self.lock();
        if notices.len() == MAX_NOTICES {
            notices.remove(0);
        }
        notices.push(Notice {
            message: message.to_owned(),
            level,
            at: Local::now(),
        });
    }
}

#[derive(Default)]
pub struct WatchLog {
    watched: DashSet<Media>,
}

impl WatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_watched(&self, media: &Media) -> bool {
        self.watched.contains(media)
    }
}

impl WatchHistory for WatchLog {
    fn mark_movie_watched(&self, id: u64) {
        info!("Marking movie {id} as watched");
        self.watched.insert(Media::movie(id));
    }

    fn mark_episode_watched(&self, id: u64, season: u32, episode: u32) {
        info!("Marking tv {id} S{season}:E{episode} as watched");
        self.watched
            .insert(Media::episode(id, Some(season), Some(episode)));
    }
}

/// There's no episode list to refresh without a browser.
pub struct NoDetailView;

impl DetailView for NoDetailView {
    fn is_open(&self) -> bool {
        false
    }

    fn reload_episodes(&self, _show_id: u64) {}
}
