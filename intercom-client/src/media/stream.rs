use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::media::FrameSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// What to ask the capture devices for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl MediaConstraints {
    pub fn is_empty(&self) -> bool {
        !self.video && !self.audio
    }
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

struct TrackInner {
    id: String,
    kind: MediaKind,
    label: String,
    enabled: AtomicBool,
    ended: AtomicBool,
    source: Option<Arc<dyn FrameSource>>,
}

/// Shared handle to one local track. Clones refer to the same track.
#[derive(Clone)]
pub struct MediaTrack(Arc<TrackInner>);

impl MediaTrack {
    pub fn new(
        kind: MediaKind,
        label: impl Into<String>,
        source: Option<Arc<dyn FrameSource>>,
    ) -> Self {
        Self(Arc::new(TrackInner {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            enabled: AtomicBool::new(true),
            ended: AtomicBool::new(false),
            source,
        }))
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn kind(&self) -> MediaKind {
        self.0.kind
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn source(&self) -> Option<&Arc<dyn FrameSource>> {
        self.0.source.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.0.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.0.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_live(&self) -> bool {
        !self.0.ended.load(Ordering::Acquire)
    }

    /// End the track. Stopping an ended track does nothing.
    /// Returns whether this call ended it.
    pub fn stop(&self) -> bool {
        !self.0.ended.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("label", &self.0.label)
            .field("enabled", &self.is_enabled())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Local capture: a group of tracks under one stream id.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: MediaKind) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Flip `enabled` on every track of `kind`. Returns the new state of
    /// the first such track, `None` if the stream has none.
    pub fn toggle(&self, kind: MediaKind) -> Option<bool> {
        let mut first = None;
        for track in self.tracks_of(kind) {
            let enabled = !track.is_enabled();
            track.set_enabled(enabled);
            first.get_or_insert(enabled);
        }
        first
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: MediaKind,
}

/// Media arriving from the other room, as announced by the peer connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub id: String,
    pub tracks: Vec<RemoteTrack>,
}
