use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::*;

use crate::surface::{FrameHost, FrameId, FrameSpec, LoadSignal, MountedFrame};

/// Finds out whether a url loads, using a throwaway offscreen frame.
#[derive(Clone)]
pub struct Prober {
    host: Arc<dyn FrameHost>,
}

/// Removes the probe frame however the probe ends, including being dropped mid-flight.
struct FrameGuard<'a> {
    host: &'a dyn FrameHost,
    id: FrameId,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.host.unmount(self.id);
    }
}

impl Prober {
    pub fn new(host: Arc<dyn FrameHost>) -> Self {
        Prober { host }
    }

    /// `true` only when a load signal shows up before `limit`. Error signals,
    /// timeouts and frames that can't even be mounted are all `false`.
    pub async fn probe(&self, url: &str, limit: Duration) -> bool {
        let start = Instant::now();
        let MountedFrame { id, signal } = match self.host.mount(FrameSpec::offscreen(url)) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Couldn't start probing {url}: {e:?}");
                return false;
            }
        };
        let _guard = FrameGuard {
            host: &*self.host,
            id,
        };
        let works = matches!(
            time::timeout(limit, signal).await,
            Ok(Ok(LoadSignal::Loaded))
        );
        debug!("Probed {url} => {works} in {:?}", start.elapsed());
        works
    }
}
