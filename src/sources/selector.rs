use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::{join_all, select_ok};
use futures::FutureExt;
use tokio::time::{self, Instant};
use tracing::*;

use crate::config::PlayerConfig;
use crate::models::Media;
use crate::sources::{CacheScope, ProbeCache, Prober, SourceList};

/// Picks the embed source to play from, by racing probes of every source.
pub struct SourceSelector {
    sources: SourceList,
    prober: Prober,
    cache: Arc<ProbeCache>,
    scope: CacheScope,
    probe_timeout: Duration,
    deadline: Duration,
    quick_timeout: Duration,
    pretest_timeout: Duration,
    pretest_movie_id: u64,
    reachability: DashMap<usize, bool>,
}

impl SourceSelector {
    pub fn new(
        config: &PlayerConfig,
        sources: SourceList,
        prober: Prober,
        cache: Arc<ProbeCache>,
    ) -> Self {
        SourceSelector {
            sources,
            prober,
            cache,
            scope: config.cache_scope,
            probe_timeout: config.timings.probe_timeout(),
            deadline: config.timings.selection_deadline(),
            quick_timeout: config.timings.quick_probe_timeout(),
            pretest_timeout: config.timings.pretest_timeout(),
            pretest_movie_id: config.pretest_movie_id,
            reachability: DashMap::new(),
        }
    }

    pub fn sources(&self) -> &SourceList {
        &self.sources
    }

    /// Index of the first source whose probe loads, 0 when none does.
    ///
    /// Only a winner gets cached. Probes still running when the winner settles are
    /// dropped, which also removes their frames.
    #[instrument(skip_all, fields(media = %media))]
    pub async fn select_best_source(&self, media: &Media) -> usize {
        let key = self.scope.key(media);
        if let Some(index) = self.cache.get(&key) {
            return self.sources.normalize(index);
        }

        let start = Instant::now();
        let probes = self
            .sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let url = source.url_for(media);
                async move {
                    if self.prober.probe(&url, self.probe_timeout).await {
                        Ok(index)
                    } else {
                        Err(index)
                    }
                }
                .boxed()
            })
            .collect::<Vec<_>>();

        match time::timeout(self.deadline, select_ok(probes)).await {
            Ok(Ok((index, _losers))) => {
                info!(
                    "Selected '{}' for {key} in {:?}",
                    self.sources.name(index),
                    start.elapsed()
                );
                self.cache.put(key, index);
                index
            }
            Ok(Err(_)) => {
                warn!(
                    "None of the {} sources loaded for {key}, defaulting to the first",
                    self.sources.len()
                );
                0
            }
            Err(_) => {
                error!("Selection for {key} didn't finish in {:?}", self.deadline);
                0
            }
        }
    }

    /// A single probe with the shorter timeout used while switching.
    pub async fn quick_test_source(&self, index: usize, media: &Media) -> bool {
        if index >= self.sources.len() {
            return false;
        }
        let url = self.sources.get(index).url_for(media);
        self.prober.probe(&url, self.quick_timeout).await
    }

    /// Probes every source with a well known movie and remembers which ones answered.
    pub async fn pretest(&self) -> Vec<bool> {
        let start = Instant::now();
        let movie = Media::movie(self.pretest_movie_id);
        let results = join_all(self.sources.iter().map(|source| {
            let url = source.url_for(&movie);
            async move { self.prober.probe(&url, self.pretest_timeout).await }
        }))
        .await;
        for (index, &works) in results.iter().enumerate() {
            self.reachability.insert(index, works);
        }
        info!(
            "Pretest finished in {:?}, {}/{} sources reachable",
            start.elapsed(),
            results.iter().filter(|&&works| works).count(),
            results.len()
        );
        results
    }

    /// Pretest outcome per source, `None` until the pretest has run.
    pub fn reachability(&self) -> Vec<Option<bool>> {
        (0..self.sources.len())
            .map(|index| self.reachability.get(&index).map(|works| *works))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::{self, Instant};

    use super::SourceSelector;
    use crate::config::PlayerConfig;
    use crate::models::Media;
    use crate::sources::{CacheScope, ProbeCache, Prober};
    use crate::surface::FrameKind;
    use crate::testing::{movie_url, source_list, tv_url, Script, ScriptedHost};

    const MOVIE: u64 = 550;

    fn selector(host: &Arc<ScriptedHost>, count: usize) -> SourceSelector {
        selector_with(host, count, CacheScope::Title)
    }

    fn selector_with(host: &Arc<ScriptedHost>, count: usize, scope: CacheScope) -> SourceSelector {
        let sources = source_list(count);
        let mut config = PlayerConfig::new(sources.iter().cloned().collect());
        config.cache_scope = scope;
        let cache = Arc::new(ProbeCache::new(config.cache_ttl()));
        SourceSelector::new(&config, sources, Prober::new(host.clone()), cache)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_winner_does_not_wait_for_others() {
        let host = ScriptedHost::new();
        host.script(movie_url(1, MOVIE), Script::Load(ms(1200)));
        let selector = selector(&host, 3);

        let start = Instant::now();
        let index = selector.select_best_source(&Media::movie(MOVIE)).await;
        assert_eq!(index, 1);
        assert!(start.elapsed() < ms(1500), "took {:?}", start.elapsed());
        assert!(host.mounted(FrameKind::Offscreen).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_winner_regardless_of_completion_order() {
        let host = ScriptedHost::new();
        host.script(movie_url(0, MOVIE), Script::Fail(ms(100)));
        host.script(movie_url(1, MOVIE), Script::Fail(ms(4000)));
        host.script(movie_url(2, MOVIE), Script::Load(ms(3000)));
        host.script(movie_url(3, MOVIE), Script::Reject);
        let selector = selector(&host, 4);
        assert_eq!(selector.select_best_source(&Media::movie(MOVIE)).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_wins() {
        let host = ScriptedHost::new();
        host.script(movie_url(0, MOVIE), Script::Load(ms(2000)));
        host.script(movie_url(2, MOVIE), Script::Load(ms(500)));
        let selector = selector(&host, 3);
        assert_eq!(selector.select_best_source(&Media::movie(MOVIE)).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_success_defaults_to_first_without_caching() {
        let host = ScriptedHost::new();
        for index in 0..3 {
            host.script(movie_url(index, MOVIE), Script::Fail(ms(200)));
        }
        let selector = selector(&host, 3);
        assert_eq!(selector.select_best_source(&Media::movie(MOVIE)).await, 0);
        assert!(selector.cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_sources_resolve_after_probe_timeout() {
        let host = ScriptedHost::new();
        let selector = selector(&host, 3);
        let start = Instant::now();
        assert_eq!(selector.select_best_source(&Media::movie(MOVIE)).await, 0);
        let elapsed = start.elapsed();
        assert!(elapsed >= ms(5000) && elapsed < ms(7000), "took {elapsed:?}");
        assert!(host.mounted(FrameKind::Offscreen).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_failing_source_resolves_to_it() {
        let host = ScriptedHost::new();
        host.script(movie_url(0, MOVIE), Script::Fail(ms(10)));
        let selector = selector(&host, 1);
        assert_eq!(selector.select_best_source(&Media::movie(MOVIE)).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_choice_is_shared_by_episodes_until_expiry() {
        let host = ScriptedHost::new();
        host.script(tv_url(2, 1399, 1, 1), Script::Load(ms(100)));
        let selector = selector(&host, 3);

        let first = Media::episode(1399, Some(1), Some(1));
        assert_eq!(selector.select_best_source(&first).await, 2);
        let probes = host.history(FrameKind::Offscreen).len();

        time::advance(Duration::from_secs(9 * 60)).await;
        let later = Media::episode(1399, Some(4), Some(2));
        assert_eq!(selector.select_best_source(&later).await, 2);
        assert_eq!(host.history(FrameKind::Offscreen).len(), probes);

        time::advance(Duration::from_secs(2 * 60)).await;
        assert_eq!(selector.select_best_source(&later).await, 0);
        assert!(host.history(FrameKind::Offscreen).len() > probes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_episode_scope_probes_each_episode() {
        let host = ScriptedHost::new();
        host.script(tv_url(1, 1399, 1, 1), Script::Load(ms(100)));
        host.script(tv_url(2, 1399, 1, 2), Script::Load(ms(100)));
        let selector = selector_with(&host, 3, CacheScope::Episode);

        assert_eq!(
            selector
                .select_best_source(&Media::episode(1399, Some(1), Some(1)))
                .await,
            1
        );
        assert_eq!(
            selector
                .select_best_source(&Media::episode(1399, Some(1), Some(2)))
                .await,
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_test_source() {
        let host = ScriptedHost::new();
        host.script(movie_url(1, MOVIE), Script::Load(ms(3500)));
        host.script(movie_url(2, MOVIE), Script::Load(ms(4500)));
        let selector = selector(&host, 3);
        let movie = Media::movie(MOVIE);
        assert!(selector.quick_test_source(1, &movie).await);
        assert!(!selector.quick_test_source(2, &movie).await);
        assert!(!selector.quick_test_source(3, &movie).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pretest_records_reachability() {
        let host = ScriptedHost::new();
        host.script(movie_url(0, 278), Script::Load(ms(1000)));
        host.script(movie_url(1, 278), Script::Fail(ms(1000)));
        let selector = selector(&host, 3);
        assert_eq!(selector.reachability(), vec![None, None, None]);
        assert_eq!(selector.pretest().await, vec![true, false, false]);
        assert_eq!(
            selector.reachability(),
            vec![Some(true), Some(false), Some(false)]
        );
    }
}
