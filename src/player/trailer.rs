use tracing::*;

use crate::models::{MediaType, VideoEntry};
use crate::player::Player;
use crate::surface::{class, Element, FrameSpec, NoticeLevel};
use crate::utils::encode_uri_component;

const YOUTUBE: &str = "YouTube";

/// Official trailer, any trailer, teaser, anything; YouTube only.
pub fn pick_trailer(videos: &[VideoEntry]) -> Option<&VideoEntry> {
    let youtube = || videos.iter().filter(|video| video.site == YOUTUBE);
    youtube()
        .find(|video| video.kind == "Trailer" && video.official)
        .or_else(|| youtube().find(|video| video.kind == "Trailer"))
        .or_else(|| youtube().find(|video| video.kind == "Teaser"))
        .or_else(|| youtube().next())
}

pub fn trailer_url(key: &str) -> String {
    format!(
        "https://www.youtube.com/embed/{}?autoplay=1&rel=0&modestbranding=1",
        encode_uri_component(key)
    )
}

impl Player {
    /// Shows the trailer overlay for a title, replacing any trailer already open.
    #[instrument(skip(self))]
    pub async fn play_trailer(&self, media_type: MediaType, id: u64) -> Option<VideoEntry> {
        let inner = &self.inner;
        let details = match inner.metadata.details(media_type, id).await {
            Ok(details) => details,
            Err(e) => {
                warn!("Couldn't fetch videos of {} {id}: {e:?}", media_type.as_str());
                inner.notify("Cannot load trailer info", NoticeLevel::Error);
                return None;
            }
        };
        if details.videos().is_empty() {
            inner.notify("No trailer available", NoticeLevel::Warning);
            return None;
        }
        let Some(trailer) = pick_trailer(details.videos()).cloned() else {
            inner.notify("No YouTube trailer found", NoticeLevel::Warning);
            return None;
        };
        if !inner.chrome.has(Element::TrailerModal) || !inner.chrome.has(Element::TrailerContainer)
        {
            inner.notify("Trailer player error", NoticeLevel::Error);
            return None;
        }

        self.close_trailer();
        let url = trailer_url(&trailer.key);
        let frame = match inner.frames.mount(FrameSpec::trailer(&url)) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Couldn't mount trailer {url}: {e:?}");
                inner.notify("Trailer failed to load", NoticeLevel::Error);
                return None;
            }
        };
        info!("Playing trailer of {} {id} => {url}", media_type.as_str());
        inner.lock_shell().trailer = Some(frame.id);
        inner
            .chrome
            .set_class(Element::TrailerModal, class::ACTIVE, true);
        Some(trailer)
    }

    pub fn close_trailer(&self) {
        let inner = &self.inner;
        let frame = inner.lock_shell().trailer.take();
        if let Some(frame) = frame {
            inner.frames.unmount(frame);
            debug!("Closed trailer {frame:?}");
        }
        inner
            .chrome
            .set_class(Element::TrailerModal, class::ACTIVE, false);
    }
}

#[cfg(test)]
mod test {
    use super::{pick_trailer, trailer_url};
    use crate::models::{MediaDetails, MediaType, VideoEntry, VideoList};
    use crate::surface::{class, Element, FrameKind, NoticeLevel, PlayerChrome, TRAILER_PERMISSIONS};
    use crate::testing::Fixture;

    fn video(kind: &str, site: &str, official: bool, key: &str) -> VideoEntry {
        VideoEntry {
            kind: kind.to_owned(),
            site: site.to_owned(),
            official,
            key: key.to_owned(),
        }
    }

    fn details(videos: Vec<VideoEntry>) -> MediaDetails {
        MediaDetails {
            title: Some("Fight Club".into()),
            videos: Some(VideoList { results: videos }),
            ..MediaDetails::default()
        }
    }

    #[test]
    fn test_official_trailer_first() {
        let videos = vec![
            video("Trailer", "YouTube", false, "unofficial"),
            video("Trailer", "YouTube", true, "official"),
        ];
        assert_eq!(pick_trailer(&videos).map(|v| v.key.as_str()), Some("official"));
    }

    #[test]
    fn test_trailer_priority() {
        let videos = vec![
            video("Featurette", "YouTube", true, "featurette"),
            video("Teaser", "YouTube", true, "teaser"),
            video("Trailer", "Vimeo", true, "vimeo"),
        ];
        assert_eq!(pick_trailer(&videos).map(|v| v.key.as_str()), Some("teaser"));

        let videos = vec![
            video("Teaser", "YouTube", true, "teaser"),
            video("Trailer", "YouTube", false, "trailer"),
        ];
        assert_eq!(pick_trailer(&videos).map(|v| v.key.as_str()), Some("trailer"));

        let videos = vec![video("Clip", "YouTube", false, "clip")];
        assert_eq!(pick_trailer(&videos).map(|v| v.key.as_str()), Some("clip"));

        let videos = vec![video("Trailer", "Vimeo", true, "vimeo")];
        assert!(pick_trailer(&videos).is_none());
    }

    #[test]
    fn test_trailer_url() {
        assert_eq!(
            trailer_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1&rel=0&modestbranding=1"
        );
    }

    #[tokio::test]
    async fn test_play_and_close_trailer() {
        let f = Fixture::with_metadata(
            1,
            details(vec![
                video("Trailer", "YouTube", false, "unofficial"),
                video("Trailer", "YouTube", true, "official"),
            ]),
        );
        let trailer = f.player.play_trailer(MediaType::Movie, 550).await;
        assert_eq!(trailer.map(|t| t.key), Some("official".to_owned()));
        assert_eq!(f.host.mounted(FrameKind::Trailer), vec![trailer_url("official")]);
        assert_eq!(
            f.host.mounted_specs(FrameKind::Trailer)[0].allow,
            Some(TRAILER_PERMISSIONS)
        );
        assert!(f.chrome.has_class(Element::TrailerModal, class::ACTIVE));
        assert!(f.player.snapshot().trailer_open);

        f.player.play_trailer(MediaType::Movie, 550).await;
        assert_eq!(f.host.mounted(FrameKind::Trailer).len(), 1);

        f.player.close_trailer();
        assert!(f.host.mounted(FrameKind::Trailer).is_empty());
        assert!(!f.chrome.has_class(Element::TrailerModal, class::ACTIVE));
    }

    #[tokio::test]
    async fn test_no_videos() {
        let f = Fixture::with_metadata(1, details(vec![]));
        assert!(f.player.play_trailer(MediaType::Tv, 1399).await.is_none());
        assert!(f.notified(NoticeLevel::Warning, "No trailer available"));
    }

    #[tokio::test]
    async fn test_no_youtube_video() {
        let f = Fixture::with_metadata(1, details(vec![video("Trailer", "Vimeo", true, "v")]));
        assert!(f.player.play_trailer(MediaType::Movie, 550).await.is_none());
        assert!(f.notified(NoticeLevel::Warning, "No YouTube trailer found"));
        assert!(f.host.history(FrameKind::Trailer).is_empty());
    }

    #[tokio::test]
    async fn test_metadata_failure() {
        let f = Fixture::new(1);
        assert!(f.player.play_trailer(MediaType::Movie, 550).await.is_none());
        assert!(f.notified(NoticeLevel::Error, "Cannot load trailer info"));
    }

    #[tokio::test]
    async fn test_missing_trailer_modal() {
        let f = Fixture::builder(1)
            .metadata(details(vec![video("Trailer", "YouTube", true, "k")]))
            .without([Element::TrailerContainer])
            .build();
        assert!(f.player.play_trailer(MediaType::Movie, 550).await.is_none());
        assert!(f.notified(NoticeLevel::Error, "Trailer player error"));
        assert!(f.host.history(FrameKind::Trailer).is_empty());
    }
}
