//! Media source construction for the two backends.
//!
//! The local player consumes a [`ConcatenatingSource`]: an ordered list of
//! [`MediaSource`] segments, one per queue item, built by a
//! [`MediaSourceFactory`] from the item's content type. The cast player
//! consumes [`CastQueueItem`]s, the receiver-side description of the same
//! item.
//!
//! Network settings (user agent, timeouts) travel in an explicit
//! [`SourceContext`] handed to the factory, so that two coordinators in the
//! same process never share hidden state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::errors::{PlayerError, Result};
use crate::model::{
    MIME_TYPE_AUDIO, MIME_TYPE_DASH, MIME_TYPE_HLS, MIME_TYPE_SS, MIME_TYPE_VIDEO_MP4, MediaItem,
    Period, Timeline,
};

pub const DEFAULT_USER_AGENT: &str = "PMOCastPlayer";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(8);

/// Data source settings shared by every source a factory builds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceContext {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl SourceContext {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ..Self::default()
        }
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Streaming technology used to play a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Dash,
    Hls,
    SmoothStreaming,
    /// Plain container (MP4, AAC, ...) read by an extractor.
    Progressive,
}

impl SourceKind {
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type {
            MIME_TYPE_DASH => Some(SourceKind::Dash),
            MIME_TYPE_HLS => Some(SourceKind::Hls),
            MIME_TYPE_SS => Some(SourceKind::SmoothStreaming),
            MIME_TYPE_VIDEO_MP4 | MIME_TYPE_AUDIO => Some(SourceKind::Progressive),
            _ => None,
        }
    }
}

/// One playable segment of the local player's concatenated source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaSource {
    pub kind: SourceKind,
    pub uri: Url,
    pub context: SourceContext,
}

#[derive(Clone, Debug, Default)]
pub struct MediaSourceFactory {
    context: SourceContext,
}

impl MediaSourceFactory {
    pub fn new(context: SourceContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SourceContext {
        &self.context
    }

    /// Builds the local source for `item`.
    ///
    /// Fails when the content type has no known source kind or the URI does
    /// not parse. Nothing is retried.
    pub fn create(&self, item: &MediaItem) -> Result<MediaSource> {
        let kind = SourceKind::from_mime_type(&item.mime_type)
            .ok_or_else(|| PlayerError::UnsupportedContentType(item.mime_type.clone()))?;
        let uri = Url::parse(&item.uri).map_err(|e| PlayerError::InvalidUri {
            uri: item.uri.clone(),
            reason: e.to_string(),
        })?;

        debug!(kind = ?kind, uri = %uri, "Built media source");

        Ok(MediaSource {
            kind,
            uri,
            context: self.context.clone(),
        })
    }
}

#[derive(Clone, Debug)]
struct Segment {
    uid: u32,
    source: MediaSource,
}

#[derive(Debug, Default)]
struct ConcatenatingInner {
    segments: Vec<Segment>,
    next_uid: u32,
}

/// Ordered list of segments played back to back by the local player.
///
/// This is a shared handle: clones observe the same segments. The
/// coordinator keeps one clone and mutates it, the prepared local player
/// keeps another and sees every change.
#[derive(Clone, Debug, Default)]
pub struct ConcatenatingSource {
    inner: Arc<Mutex<ConcatenatingInner>>,
}

impl ConcatenatingSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ConcatenatingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().segments.is_empty()
    }

    pub fn add(&self, source: MediaSource) {
        let mut inner = self.lock();
        let uid = inner.next_uid;
        inner.next_uid = inner.next_uid.wrapping_add(1);
        inner.segments.push(Segment { uid, source });
    }

    pub fn remove(&self, index: usize) -> Result<MediaSource> {
        let mut inner = self.lock();
        let len = inner.segments.len();
        if index >= len {
            return Err(PlayerError::out_of_bounds(index, len));
        }
        Ok(inner.segments.remove(index).source)
    }

    pub fn move_source(&self, from: usize, to: usize) -> Result<()> {
        let mut inner = self.lock();
        let len = inner.segments.len();
        if from >= len {
            return Err(PlayerError::out_of_bounds(from, len));
        }
        if to >= len {
            return Err(PlayerError::out_of_bounds(to, len));
        }
        let segment = inner.segments.remove(from);
        inner.segments.insert(to, segment);
        Ok(())
    }

    pub fn clear(&self) {
        self.lock().segments.clear();
    }

    pub fn get(&self, index: usize) -> Option<MediaSource> {
        self.lock().segments.get(index).map(|s| s.source.clone())
    }

    pub fn sources(&self) -> Vec<MediaSource> {
        self.lock().segments.iter().map(|s| s.source.clone()).collect()
    }

    /// Timeline as the local player sees it: one period per segment,
    /// identified by the segment uid.
    pub fn timeline(&self) -> Timeline {
        Timeline {
            periods: self
                .lock()
                .segments
                .iter()
                .map(|s| Period {
                    id: s.uid,
                    duration: None,
                })
                .collect(),
        }
    }
}

/// Receiver-side stream type. Queue items are always buffered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CastStreamType {
    Buffered,
    Live,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMetadata {
    /// 1 is the receiver's "movie" metadata type.
    pub metadata_type: u8,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMediaInfo {
    pub content_id: String,
    pub stream_type: CastStreamType,
    pub content_type: String,
    pub metadata: CastMetadata,
}

/// A media queue item as the cast receiver expects it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastQueueItem {
    pub media: CastMediaInfo,
    pub autoplay: bool,
    /// Assigned by the receiver once the item is queued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<u32>,
}

const CAST_METADATA_MOVIE: u8 = 1;

impl CastQueueItem {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl MediaItem {
    pub fn to_cast_queue_item(&self) -> CastQueueItem {
        CastQueueItem {
            media: CastMediaInfo {
                content_id: self.uri.clone(),
                stream_type: CastStreamType::Buffered,
                content_type: self.mime_type.clone(),
                metadata: CastMetadata {
                    metadata_type: CAST_METADATA_MOVIE,
                    title: self.name.clone(),
                },
            },
            autoplay: true,
            item_id: None,
        }
    }
}
