use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time::{self, Instant};
use tracing::*;

use crate::models::{Media, PlayerState};
use crate::player::{ActiveEmbed, PlayerInner, Shell};
use crate::surface::{class, Element, FrameSpec, LoadSignal, NoticeLevel, TextSlot};

/// What still has to be true when the embed gets swapped.
#[derive(Copy, Clone, Debug)]
pub(crate) enum MountGuard {
    Always,
    /// The session holding this ticket is still the current one.
    Session(u64),
    /// The embed of this generation is still mounted.
    Embed(u64),
}

impl MountGuard {
    fn holds(self, shell: &Shell) -> bool {
        match self {
            MountGuard::Always => true,
            MountGuard::Session(ticket) => {
                shell.session.as_ref().map(|s| s.ticket) == Some(ticket)
            }
            MountGuard::Embed(generation) => {
                shell.embed.as_ref().map(|e| e.generation) == Some(generation)
            }
        }
    }
}

impl PlayerInner {
    pub(crate) fn load_source(self: &Arc<Self>, media: Media, index: usize) -> usize {
        let index = self.sources.normalize(index);
        if let Err(e) = self.mount_embed(media, index, index, MountGuard::Always) {
            error!("{e:?}");
        }
        index
    }

    /// Replaces the embed with source `index` and starts watching it load.
    ///
    /// `origin` is the source the current auto-advance chain started from, the
    /// chain stops instead of coming back to it. `Ok(false)` when `guard` no longer
    /// holds and nothing was touched, `Err` when the frame couldn't be mounted.
    pub(crate) fn mount_embed(
        self: &Arc<Self>,
        media: Media,
        index: usize,
        origin: usize,
        guard: MountGuard,
    ) -> anyhow::Result<bool> {
        let source = self.sources.get(index);
        let url = source.url_for(&media);
        let mounted = {
            let mut shell = self.lock_shell();
            if !guard.holds(&shell) {
                debug!("Not loading source {index} for {media}, {guard:?} is stale");
                return Ok(false);
            }
            self.teardown_embed(&mut shell);
            self.frames.mount(FrameSpec::player(&url)).map(|frame| {
                shell.generations += 1;
                let generation = shell.generations;
                if let Some(session) = shell.session.as_mut() {
                    session.current_index = index;
                }
                if shell.state.is_active() {
                    shell.state = PlayerState::Loading;
                }
                let watcher = tokio::spawn(Arc::clone(self).confirm_load(
                    frame.signal,
                    media,
                    index,
                    origin,
                    generation,
                ));
                shell.embed = Some(ActiveEmbed {
                    frame: frame.id,
                    index,
                    generation,
                    watcher: Some(watcher),
                });
            })
        };

        match mounted {
            Ok(()) => {
                info!("Loading '{}' for {media} => {url}", source.name);
                self.chrome.set_class(Element::Loading, class::ACTIVE, true);
                self.chrome.set_text(TextSlot::SourceName, &source.name);
                Ok(true)
            }
            Err(e) => {
                self.chrome.set_class(Element::Loading, class::ACTIVE, false);
                self.notifier.notify("Player error", NoticeLevel::Error);
                Err(e.context(format!("Couldn't mount '{}' for {media}", source.name)))
            }
        }
    }

    /// Waits for the embed to report a load. An error report isn't a load,
    /// the embed keeps its full confirmation window either way.
    async fn confirm_load(
        self: Arc<Self>,
        signal: oneshot::Receiver<LoadSignal>,
        media: Media,
        index: usize,
        origin: usize,
        generation: u64,
    ) {
        let deadline = Instant::now() + self.timings.load_confirm_timeout();
        let loaded = match time::timeout_at(deadline, signal).await {
            Ok(Ok(LoadSignal::Loaded)) => true,
            Ok(_) => {
                time::sleep_until(deadline).await;
                false
            }
            Err(_) => false,
        };

        let next = self.sources.next(index);
        {
            let mut shell = self.lock_shell();
            match shell.embed.as_mut() {
                Some(embed) if embed.generation == generation => embed.watcher = None,
                _ => return,
            }
            if (loaded || next == origin) && shell.state == PlayerState::Loading {
                shell.state = PlayerState::Playing;
            }
        }

        self.chrome.set_class(Element::Loading, class::ACTIVE, false);
        let name = self.sources.name(index);
        if loaded {
            self.notifier
                .notify(&format!("Playing: {name}"), NoticeLevel::Success);
            return;
        }
        if next == origin {
            warn!("No source confirmed loading {media}, keeping '{name}'");
            self.notifier.notify(
                "Video loaded. If blank, try Switch Source.",
                NoticeLevel::Info,
            );
            return;
        }

        warn!(
            "'{name}' didn't load {media} in {:?}",
            self.timings.load_confirm_timeout()
        );
        self.notifier.notify(
            &format!("Trying: {}...", self.sources.name(next)),
            NoticeLevel::Warning,
        );
        if let Err(e) = self.mount_embed(media, next, origin, MountGuard::Embed(generation)) {
            error!("Auto-advance stopped: {e:?}");
        }
    }

    /// Unmounts the embed and stops its watcher. A watcher that already finished
    /// detached itself, so it is never aborted from here.
    pub(crate) fn teardown_embed(&self, shell: &mut Shell) {
        if let Some(embed) = shell.embed.take() {
            if let Some(watcher) = embed.watcher {
                watcher.abort();
            }
            self.frames.unmount(embed.frame);
        }
    }
}
