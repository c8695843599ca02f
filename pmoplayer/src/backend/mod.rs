//! Playback backend abstraction.
//!
//! The coordinator drives two interchangeable engines through these traits:
//!   - a local player fed with a [`ConcatenatingSource`],
//!   - a cast player exposing an explicit, id-addressed remote queue.
//!
//! Both share the [`Player`] surface (state queries, seek, stop, release).
//! Commands are fire-and-forget: a backend may apply them asynchronously and
//! reports the outcome later through [`PlayerEvent`](crate::model::PlayerEvent)s.
//! An `Err` only means the command could not be issued at all.

mod simulated;

use std::time::Duration;

pub use simulated::{
    CastCommand, CastDriver, EventSender, LocalCommand, LocalDriver, SimulatedCastPlayer,
    SimulatedLocalPlayer, event_channel,
};

use crate::errors::Result;
use crate::model::{PlaybackState, RepeatMode, Timeline};
use crate::source::{CastQueueItem, ConcatenatingSource};

/// State and transport surface common to both backends.
pub trait Player {
    fn playback_state(&self) -> PlaybackState;

    fn play_when_ready(&self) -> bool;

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<()>;

    /// Index of the window being played, if the backend has one.
    fn current_window_index(&self) -> Option<usize>;

    /// Playback position inside the current window.
    fn current_position(&self) -> Option<Duration>;

    fn current_timeline(&self) -> Timeline;

    /// Seeks to `window_index`. A `None` position means the window's default
    /// start position.
    fn seek_to(&mut self, window_index: usize, position: Option<Duration>) -> Result<()>;

    /// Halts playback. Loaded media is kept.
    fn stop(&mut self) -> Result<()>;

    /// Frees every resource held by the backend. Terminal.
    fn release(&mut self) -> Result<()>;
}

/// Player rendering on the device.
pub trait LocalPlayer: Player {
    /// (Re)prepares the player with `source`. Subsequent mutations of the
    /// shared source are picked up by the player.
    fn prepare(&mut self, source: ConcatenatingSource) -> Result<()>;
}

/// Player rendering on a cast receiver.
///
/// Queue items are addressed by the id the receiver assigned them, which is
/// the `id` of the matching period in [`Player::current_timeline`].
pub trait CastPlayer: Player {
    fn is_session_available(&self) -> bool;

    /// Appends items at the end of the remote queue.
    fn add_items(&mut self, items: &[CastQueueItem]) -> Result<()>;

    fn remove_item(&mut self, item_id: u32) -> Result<()>;

    /// Moves the item `item_id` so that it ends up at `new_index`.
    fn move_item(&mut self, item_id: u32, new_index: usize) -> Result<()>;

    /// Replaces the whole remote queue and starts at `start_index`.
    fn load_items(
        &mut self,
        items: &[CastQueueItem],
        start_index: usize,
        position: Option<Duration>,
        repeat_mode: RepeatMode,
    ) -> Result<()>;

    /// Drops the session availability notifications.
    fn clear_session_listener(&mut self);
}
