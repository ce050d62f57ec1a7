//! The player shell: picks a source, loads it, and owns everything around the embed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::bail;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::*;

use crate::config::{PlayerConfig, Timings};
use crate::models::{Media, MediaDetails, PlaySession, PlayerSnapshot, PlayerState};
use crate::sources::{ProbeCache, Prober, SourceList, SourceSelector};
use crate::surface::{
    class, DetailView, Element, FrameHost, FrameId, MetadataClient, NoticeLevel, Notifier,
    PlayerChrome, Screen, TextSlot, WatchHistory,
};

mod controls;
mod loader;
mod trailer;

use loader::MountGuard;

pub use controls::Shortcut;
pub use trailer::{pick_trailer, trailer_url};

/// Everything the player talks to, handed over once at construction.
pub struct Collaborators {
    pub frames: Arc<dyn FrameHost>,
    pub chrome: Arc<dyn PlayerChrome>,
    pub screen: Arc<dyn Screen>,
    pub notifier: Arc<dyn Notifier>,
    pub metadata: Arc<dyn MetadataClient>,
    pub watch_history: Arc<dyn WatchHistory>,
    pub detail_view: Arc<dyn DetailView>,
}

/// Cheap to clone, every clone drives the same player.
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

pub(crate) struct PlayerInner {
    timings: Timings,
    sources: SourceList,
    selector: SourceSelector,
    frames: Arc<dyn FrameHost>,
    chrome: Arc<dyn PlayerChrome>,
    screen: Arc<dyn Screen>,
    notifier: Arc<dyn Notifier>,
    metadata: Arc<dyn MetadataClient>,
    watch_history: Arc<dyn WatchHistory>,
    detail_view: Arc<dyn DetailView>,
    shell: Mutex<Shell>,
}

/// Mutable player state. Never locked across an await, only [`FrameHost`] is
/// called while it is locked.
#[derive(Default)]
pub(crate) struct Shell {
    state: PlayerState,
    session: Option<PlaySession>,
    tickets: u64,
    embed: Option<ActiveEmbed>,
    generations: u64,
    hide_timer: Option<JoinHandle<()>>,
    trailer: Option<FrameId>,
}

pub(crate) struct ActiveEmbed {
    frame: FrameId,
    index: usize,
    generation: u64,
    watcher: Option<JoinHandle<()>>,
}

impl Player {
    pub fn new(config: PlayerConfig, collaborators: Collaborators) -> anyhow::Result<Self> {
        config.validate()?;
        let cache = Arc::new(ProbeCache::new(config.cache_ttl()));
        let sources = SourceList::new(config.sources.clone())?;
        let prober = Prober::new(Arc::clone(&collaborators.frames));
        let selector = SourceSelector::new(&config, sources.clone(), prober, cache);
        let Collaborators {
            frames,
            chrome,
            screen,
            notifier,
            metadata,
            watch_history,
            detail_view,
        } = collaborators;
        let inner = PlayerInner {
            timings: config.timings,
            sources,
            selector,
            frames,
            chrome,
            screen,
            notifier,
            metadata,
            watch_history,
            detail_view,
            shell: Mutex::new(Shell::default()),
        };
        Ok(Player {
            inner: Arc::new(inner),
        })
    }

    pub fn state(&self) -> PlayerState {
        self.inner.lock_shell().state
    }

    pub fn session(&self) -> Option<PlaySession> {
        self.inner.lock_shell().session.clone()
    }

    pub fn sources(&self) -> &SourceList {
        &self.inner.sources
    }

    pub fn selector(&self) -> &SourceSelector {
        &self.inner.selector
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let fullscreen = self.inner.screen.is_fullscreen();
        let shell = self.inner.lock_shell();
        PlayerSnapshot {
            state: shell.state,
            session: shell.session.clone(),
            source: shell
                .embed
                .as_ref()
                .map(|embed| self.inner.sources.name(embed.index).to_owned()),
            embed_mounted: shell.embed.is_some(),
            fullscreen,
            trailer_open: shell.trailer.is_some(),
        }
    }

    /// Starts playing `media` from the best source, returns the index of that source.
    #[instrument(skip(self))]
    pub async fn play(&self, media: Media) -> anyhow::Result<usize> {
        let inner = &self.inner;
        match media {
            Media::Movie { id } => inner.watch_history.mark_movie_watched(id),
            Media::Tv {
                id,
                season,
                episode,
            } => inner
                .watch_history
                .mark_episode_watched(id, season, episode),
        }
        if !inner.chrome.has(Element::Overlay) || !inner.chrome.has(Element::Container) {
            inner.notify("Player error", NoticeLevel::Error);
            bail!("Player overlay is missing, can't play {media}");
        }

        let ticket = {
            let mut shell = inner.lock_shell();
            inner.teardown_embed(&mut shell);
            shell.tickets += 1;
            let ticket = shell.tickets;
            shell.session = Some(PlaySession::new(media, ticket));
            shell.state = PlayerState::Selecting;
            ticket
        };
        inner.chrome.set_class(Element::ClickZone, class::HIDDEN, true);
        inner.chrome.set_text(TextSlot::Title, "Finding best source...");
        inner.chrome.set_class(Element::Loading, class::ACTIVE, true);
        inner.chrome.set_text(TextSlot::SourceName, "Detecting...");
        inner.chrome.set_class(Element::Overlay, class::ACTIVE, true);
        inner.chrome.set_class(Element::Page, class::NO_SCROLL, true);
        if let Err(e) = inner.screen.lock_landscape() {
            debug!("Landscape lock refused: {e}");
        }
        inner.notify("Auto-detecting best source...", NoticeLevel::Info);

        let index = inner.selector.select_best_source(&media).await;
        let name = inner.sources.name(index).to_owned();
        inner
            .chrome
            .set_text(TextSlot::Title, &format!("Loading: {name}"));
        match inner.mount_embed(media, index, index, MountGuard::Session(ticket)) {
            Ok(true) => {}
            Ok(false) => bail!("Playback of {media} was closed or replaced while selecting a source"),
            Err(e) => {
                self.close();
                return Err(e.context(format!("Couldn't start playing {media} from '{name}'")));
            }
        }

        tokio::spawn(Arc::clone(inner).fetch_player_title(media, ticket));
        inner.show_controls();
        inner.restart_hide_timer();
        Ok(index)
    }

    /// Loads `index` (wrapped into range) for `media`, replacing whatever embed is mounted.
    pub fn load_source(&self, media: Media, index: usize) -> usize {
        self.inner.load_source(media, index)
    }

    /// Moves on to the next source unconditionally.
    pub fn switch_source(&self) -> Option<usize> {
        let inner = &self.inner;
        let session = inner.lock_shell().session.clone();
        let Some(session) = session else {
            inner.notify("Nothing is playing", NoticeLevel::Warning);
            return None;
        };
        let next = inner.sources.next(session.current_index);
        inner.notify(
            &format!(
                "Switching to: {} ({}/{})",
                inner.sources.name(next),
                next + 1,
                inner.sources.len()
            ),
            NoticeLevel::Info,
        );
        inner.set_state(PlayerState::Switching);
        inner
            .switch_to(session.media, next, session.ticket)
            .then_some(next)
    }

    /// Probes the other sources one by one, starting right after the current one,
    /// and loads the first that answers. Falls back to [`Player::switch_source`].
    pub async fn smart_switch(&self) -> Option<usize> {
        let inner = &self.inner;
        let session = inner.lock_shell().session.clone();
        let Some(session) = session else {
            inner.notify("Nothing is playing", NoticeLevel::Warning);
            return None;
        };
        inner.set_state(PlayerState::Switching);
        inner.notify("Searching for working source...", NoticeLevel::Info);

        let count = inner.sources.len();
        for offset in 1..count {
            let index = (session.current_index + offset) % count;
            let name = inner.sources.name(index);
            inner.notify(&format!("Testing: {name}..."), NoticeLevel::Info);
            let works = inner
                .selector
                .quick_test_source(index, &session.media)
                .await;
            if !inner.is_current(session.ticket) {
                debug!("Playback changed while testing '{name}', stopping smart switch");
                return None;
            }
            if works {
                inner.notify(&format!("Found working: {name}"), NoticeLevel::Success);
                return inner
                    .switch_to(session.media, index, session.ticket)
                    .then_some(index);
            }
        }

        inner.notify("No confirmed source, cycling...", NoticeLevel::Warning);
        self.switch_source()
    }

    /// Tears everything down and goes back to idle.
    pub fn close(&self) {
        let inner = &self.inner;
        let session = {
            let mut shell = inner.lock_shell();
            inner.teardown_embed(&mut shell);
            if let Some(timer) = shell.hide_timer.take() {
                timer.abort();
            }
            shell.state = PlayerState::Idle;
            shell.session.take()
        };
        inner.chrome.set_class(Element::ClickZone, class::HIDDEN, false);
        inner.chrome.set_class(Element::Overlay, class::ACTIVE, false);
        inner.chrome.set_class(Element::Page, class::NO_SCROLL, false);

        if let Some(Media::Tv { id, .. }) = session.as_ref().map(|s| s.media) {
            if inner.detail_view.is_open() {
                inner.detail_view.reload_episodes(id);
            }
        }

        inner.exit_fullscreen();
        if let Err(e) = inner.screen.unlock_orientation() {
            debug!("Orientation unlock refused: {e}");
        }
        if let Some(session) = session {
            info!("Closed player for {}", session.media);
        }
    }

    pub async fn pretest_sources(&self) -> Vec<bool> {
        self.inner.selector.pretest().await
    }

    /// Runs the source pretest in the background once `pretest_delay` has passed.
    pub fn schedule_pretest(&self) -> JoinHandle<()> {
        let player = self.clone();
        let delay = self.inner.timings.pretest_delay();
        tokio::spawn(async move {
            time::sleep(delay).await;
            player.pretest_sources().await;
        })
    }
}

impl PlayerInner {
    pub(crate) fn lock_shell(&self) -> MutexGuard<'_, Shell> {
        self.shell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, message: &str, level: NoticeLevel) {
        self.notifier.notify(message, level);
    }

    fn set_state(&self, state: PlayerState) {
        let mut shell = self.lock_shell();
        if shell.session.is_some() {
            shell.state = state;
        }
    }

    /// A failed mount keeps the session, the user can still switch again or close.
    fn switch_to(self: &Arc<Self>, media: Media, index: usize, ticket: u64) -> bool {
        match self.mount_embed(media, index, index, MountGuard::Session(ticket)) {
            Ok(mounted) => mounted,
            Err(e) => {
                error!("{e:?}");
                false
            }
        }
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.lock_shell()
            .session
            .as_ref()
            .map(|session| session.ticket == ticket)
            .unwrap_or(false)
    }

    async fn fetch_player_title(self: Arc<Self>, media: Media, ticket: u64) {
        let details = self.metadata.details(media.media_type(), media.id()).await;
        if let Err(e) = &details {
            warn!("Couldn't fetch details of {media}: {e:?}");
        }
        let title = player_title(&media, details);
        if self.is_current(ticket) {
            self.chrome.set_text(TextSlot::Title, &title);
        }
    }
}

fn player_title(media: &Media, details: anyhow::Result<MediaDetails>) -> String {
    match (*media, details) {
        (Media::Movie { .. }, Ok(details)) => details
            .title
            .or(details.name)
            .unwrap_or_else(|| "Movie".to_owned()),
        (
            Media::Tv {
                season, episode, ..
            },
            Ok(details),
        ) => {
            let show = details
                .name
                .or(details.original_name)
                .unwrap_or_else(|| "Series".to_owned());
            format!("{show} — S{season}:E{episode}")
        }
        (Media::Movie { .. }, Err(_)) => "Movie".to_owned(),
        (
            Media::Tv {
                season, episode, ..
            },
            Err(_),
        ) => format!("S{season}:E{episode}"),
    }
}
