//! Scripted collaborators for the player and selector tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time;

use crate::config::PlayerConfig;
use crate::headless::{HeadlessChrome, HeadlessScreen, NoticeLog, WatchLog};
use crate::models::{MediaDetails, MediaType};
use crate::player::{Collaborators, Player};
use crate::sources::{EmbedSource, SourceList};
use crate::surface::{
    DetailView, Element, FrameHost, FrameId, FrameKind, FrameSpec, LoadSignal, MetadataClient,
    MountedFrame, NoticeLevel,
};

/// What a frame does once mounted.
#[derive(Copy, Clone, Debug)]
pub enum Script {
    Load(Duration),
    Fail(Duration),
    Never,
    /// Mounting itself fails.
    Reject,
}

/// Frame host whose frames behave as scripted per url; unscripted urls never settle.
#[derive(Default)]
pub struct ScriptedHost {
    scripts: DashMap<String, Script>,
    next_id: AtomicU64,
    mounted: DashMap<FrameId, FrameSpec>,
    history: Mutex<Vec<FrameSpec>>,
    silent: DashMap<FrameId, oneshot::Sender<LoadSignal>>,
}

impl ScriptedHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, url: impl Into<String>, script: Script) {
        self.scripts.insert(url.into(), script);
    }

    /// Urls currently mounted, oldest first.
    pub fn mounted(&self, kind: FrameKind) -> Vec<String> {
        self.mounted_specs(kind)
            .into_iter()
            .map(|spec| spec.url)
            .collect()
    }

    pub fn mounted_specs(&self, kind: FrameKind) -> Vec<FrameSpec> {
        let mut frames = self
            .mounted
            .iter()
            .filter(|frame| frame.value().kind == kind)
            .map(|frame| (*frame.key(), frame.value().clone()))
            .collect::<Vec<_>>();
        frames.sort_by_key(|(id, _)| id.0);
        frames.into_iter().map(|(_, spec)| spec).collect()
    }

    /// Every url ever mounted, in mount order.
    pub fn history(&self, kind: FrameKind) -> Vec<String> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|spec| spec.kind == kind)
            .map(|spec| spec.url.clone())
            .collect()
    }
}

impl FrameHost for ScriptedHost {
    fn mount(&self, spec: FrameSpec) -> anyhow::Result<MountedFrame> {
        let script = self
            .scripts
            .get(&spec.url)
            .map(|script| *script)
            .unwrap_or(Script::Never);
        if let Script::Reject = script {
            bail!("Refusing to mount {}", spec.url);
        }

        let id = FrameId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, signal) = oneshot::channel();
        match script {
            Script::Load(delay) | Script::Fail(delay) => {
                let outcome = match script {
                    Script::Load(_) => LoadSignal::Loaded,
                    _ => LoadSignal::Failed,
                };
                tokio::spawn(async move {
                    time::sleep(delay).await;
                    sender.send(outcome).ok();
                });
            }
            _ => {
                self.silent.insert(id, sender);
            }
        }
        self.history.lock().unwrap().push(spec.clone());
        self.mounted.insert(id, spec);
        Ok(MountedFrame { id, signal })
    }

    fn unmount(&self, id: FrameId) {
        self.mounted.remove(&id);
        self.silent.remove(&id);
    }
}

pub fn source_list(count: usize) -> SourceList {
    let sources = (0..count)
        .map(|i| {
            EmbedSource::new(
                format!("Source {i}"),
                format!("https://s{i}.example/movie/{{id}}"),
                format!("https://s{i}.example/tv/{{id}}/{{season}}/{{episode}}"),
            )
        })
        .collect();
    SourceList::new(sources).unwrap()
}

pub fn movie_url(index: usize, id: u64) -> String {
    format!("https://s{index}.example/movie/{id}")
}

pub fn tv_url(index: usize, id: u64, season: u32, episode: u32) -> String {
    format!("https://s{index}.example/tv/{id}/{season}/{episode}")
}

/// Answers every lookup with the same details, or fails when there are none.
pub struct StaticMetadata(Option<MediaDetails>);

impl MetadataClient for StaticMetadata {
    fn details(&self, media_type: MediaType, id: u64) -> BoxFuture<'_, anyhow::Result<MediaDetails>> {
        let details = self
            .0
            .clone()
            .ok_or_else(|| anyhow!("No details for {} {id}", media_type.as_str()));
        async move { details }.boxed()
    }
}

#[derive(Default)]
pub struct RecordingDetailView {
    open: AtomicBool,
    reloaded: Mutex<Vec<u64>>,
}

impl RecordingDetailView {
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Relaxed);
    }

    pub fn reloaded(&self) -> Vec<u64> {
        self.reloaded.lock().unwrap().clone()
    }
}

impl DetailView for RecordingDetailView {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    fn reload_episodes(&self, show_id: u64) {
        self.reloaded.lock().unwrap().push(show_id);
    }
}

/// A player over scripted collaborators, with handles on all of them.
pub struct Fixture {
    pub player: Player,
    pub host: Arc<ScriptedHost>,
    pub chrome: Arc<HeadlessChrome>,
    pub screen: Arc<HeadlessScreen>,
    pub notices: Arc<NoticeLog>,
    pub watched: Arc<WatchLog>,
    pub detail: Arc<RecordingDetailView>,
}

pub struct FixtureBuilder {
    count: usize,
    metadata: Option<MediaDetails>,
    missing: HashSet<Element>,
}

impl FixtureBuilder {
    pub fn metadata(mut self, details: MediaDetails) -> Self {
        self.metadata = Some(details);
        self
    }

    pub fn without(mut self, elements: impl IntoIterator<Item = Element>) -> Self {
        self.missing.extend(elements);
        self
    }

    pub fn build(self) -> Fixture {
        let host = ScriptedHost::new();
        let chrome = Arc::new(HeadlessChrome::without(self.missing));
        let screen = Arc::new(HeadlessScreen::new());
        let notices = Arc::new(NoticeLog::new());
        let watched = Arc::new(WatchLog::new());
        let detail = Arc::new(RecordingDetailView::default());
        let config = PlayerConfig::new(source_list(self.count).iter().cloned().collect());
        let collaborators = Collaborators {
            frames: host.clone(),
            chrome: chrome.clone(),
            screen: screen.clone(),
            notifier: notices.clone(),
            metadata: Arc::new(StaticMetadata(self.metadata)),
            watch_history: watched.clone(),
            detail_view: detail.clone(),
        };
        let player = Player::new(config, collaborators).unwrap();
        Fixture {
            player,
            host,
            chrome,
            screen,
            notices,
            watched,
            detail,
        }
    }
}

impl Fixture {
    pub fn builder(count: usize) -> FixtureBuilder {
        FixtureBuilder {
            count,
            metadata: None,
            missing: HashSet::new(),
        }
    }

    pub fn new(count: usize) -> Self {
        Self::builder(count).build()
    }

    pub fn with_chrome(count: usize, missing: impl IntoIterator<Item = Element>) -> Self {
        Self::builder(count).without(missing).build()
    }

    pub fn with_metadata(count: usize, details: MediaDetails) -> Self {
        Self::builder(count).metadata(details).build()
    }

    pub fn notified(&self, level: NoticeLevel, message: &str) -> bool {
        self.notices
            .messages()
            .iter()
            .any(|(l, m)| *l == level && m == message)
    }
}
