use std::sync::Arc;

use tokio::time;
use tracing::*;

use crate::player::{Player, PlayerInner};
use crate::surface::{class, Element, TextSlot};

/// Keys the player reacts to while something is playing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shortcut {
    Fullscreen,
    Close,
    Switch,
    SmartSwitch,
}

impl Shortcut {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "f" => Some(Shortcut::Fullscreen),
            "escape" | "esc" => Some(Shortcut::Close),
            "s" => Some(Shortcut::Switch),
            "a" => Some(Shortcut::SmartSwitch),
            _ => None,
        }
    }
}

impl Player {
    /// Returns whether the player is fullscreen afterwards.
    pub fn toggle_fullscreen(&self) -> bool {
        let inner = &self.inner;
        if inner.screen.is_fullscreen() {
            inner.exit_fullscreen();
        } else {
            match inner.screen.enter_fullscreen(Element::Container) {
                Ok(()) => {
                    if let Err(e) = inner.screen.lock_landscape() {
                        debug!("Landscape lock refused: {e}");
                    }
                }
                Err(e) => warn!("Couldn't enter fullscreen: {e:?}"),
            }
        }
        inner.update_fullscreen_button();
        inner.screen.is_fullscreen()
    }

    /// Fullscreen may also be left from outside, e.g. with the browser's own key.
    pub fn on_fullscreen_change(&self) {
        self.inner.update_fullscreen_button();
    }

    pub fn on_double_click(&self) {
        if self.state().is_active() {
            self.toggle_fullscreen();
        }
    }

    /// Pointer or touch activity over the player.
    pub fn on_activity(&self) {
        self.inner.show_controls();
        self.inner.restart_hide_timer();
    }

    /// Returns `true` when the key was handled and its default should be suppressed.
    pub async fn handle_key(&self, key: &str) -> bool {
        if !self.state().is_active() {
            return false;
        }
        let Some(shortcut) = Shortcut::from_key(key) else {
            return false;
        };
        debug!("Key '{key}' => {shortcut:?}");
        match shortcut {
            Shortcut::Fullscreen => {
                self.toggle_fullscreen();
            }
            Shortcut::Close => self.close(),
            Shortcut::Switch => {
                self.switch_source();
            }
            Shortcut::SmartSwitch => {
                self.smart_switch().await;
            }
        }
        true
    }
}

impl PlayerInner {
    pub(crate) fn show_controls(&self) {
        self.chrome
            .set_class(Element::Container, class::SHOW_CONTROLS, true);
    }

    pub(crate) fn restart_hide_timer(self: &Arc<Self>) {
        let chrome = Arc::clone(&self.chrome);
        let delay = self.timings.controls_timeout();
        let timer = tokio::spawn(async move {
            time::sleep(delay).await;
            chrome.set_class(Element::Container, class::SHOW_CONTROLS, false);
        });
        if let Some(previous) = self.lock_shell().hide_timer.replace(timer) {
            previous.abort();
        }
    }

    pub(crate) fn exit_fullscreen(&self) {
        if self.screen.is_fullscreen() {
            if let Err(e) = self.screen.exit_fullscreen() {
                warn!("Couldn't exit fullscreen: {e:?}");
            }
        }
        self.update_fullscreen_button();
    }

    fn update_fullscreen_button(&self) {
        let label = if self.screen.is_fullscreen() {
            "Exit"
        } else {
            "Fullscreen"
        };
        self.chrome.set_text(TextSlot::FullscreenButton, label);
    }
}
