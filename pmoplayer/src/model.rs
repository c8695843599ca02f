use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MIME_TYPE_DASH: &str = "application/dash+xml";
pub const MIME_TYPE_HLS: &str = "application/x-mpegURL";
pub const MIME_TYPE_SS: &str = "application/vnd.ms-sstr+xml";
pub const MIME_TYPE_VIDEO_MP4: &str = "video/mp4";
pub const MIME_TYPE_AUDIO: &str = "audio/mp4a-latm";

/// One entry of the media queue.
///
/// Items are immutable once enqueued. The coordinator identifies them by
/// position, never by content: the same sample may be queued twice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// URI the media is fetched from.
    pub uri: String,
    /// Human readable label shown in the queue view.
    pub name: String,
    /// Content type hint used to pick the source kind and sent to the
    /// cast receiver as `contentType`.
    pub mime_type: String,
}

impl MediaItem {
    pub fn new(uri: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Which of the two backends is driving playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Local,
    Remote,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Remote => "remote",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend playback state, shared by the local and cast players.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing prepared, or stopped.
    Idle,
    Buffering,
    Ready,
    /// The last item finished playing.
    Ended,
}

impl PlaybackState {
    /// Whether the backend's window index designates a loaded item.
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackState::Idle | PlaybackState::Ended)
    }

    /// One letter code used by the event logger.
    pub fn short_code(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "I",
            PlaybackState::Buffering => "B",
            PlaybackState::Ready => "R",
            PlaybackState::Ended => "E",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "OFF",
            RepeatMode::One => "ONE",
            RepeatMode::All => "ALL",
        }
    }
}

/// Why the playing position jumped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscontinuityReason {
    /// Automatic transition to the next item.
    PeriodTransition,
    Seek,
    /// The position was adjusted by the backend itself.
    Internal,
}

impl DiscontinuityReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscontinuityReason::PeriodTransition => "PERIOD_TRANSITION",
            DiscontinuityReason::Seek => "SEEK",
            DiscontinuityReason::Internal => "INTERNAL",
        }
    }
}

/// A backend's addressable unit for one queue item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Period {
    /// Stable identifier. For the cast backend this is the remote queue item
    /// id, which survives reordering; for the local backend it is the
    /// segment uid.
    pub id: u32,
    pub duration: Option<Duration>,
}

/// Snapshot of a backend's timeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Timeline {
    pub periods: Vec<Period>,
}

impl Timeline {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn period(&self, index: usize) -> Option<&Period> {
        self.periods.get(index)
    }
}

/// Notification emitted by a backend.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEventKind {
    StateChanged {
        play_when_ready: bool,
        state: PlaybackState,
    },
    PositionDiscontinuity {
        reason: DiscontinuityReason,
    },
    TimelineChanged {
        timeline: Timeline,
    },
    RepeatModeChanged {
        mode: RepeatMode,
    },
    /// A cast session became available (remote backend only).
    SessionAvailable,
    /// The cast session went away (remote backend only).
    SessionUnavailable,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerEvent {
    pub source: BackendKind,
    pub kind: PlayerEventKind,
}

impl PlayerEvent {
    pub fn new(source: BackendKind, kind: PlayerEventKind) -> Self {
        Self { source, kind }
    }
}
