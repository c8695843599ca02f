//! # pmoplayer - Local / cast playback queue coordination
//!
//! This crate keeps one ordered media queue in sync across two playback
//! backends:
//! - a local player, fed with a concatenated media source,
//! - a cast player, which holds its own id-addressed queue on the receiver.
//!
//! The [`QueueCoordinator`] owns the queue and both backends, forwards queue
//! edits to whichever backend is active, hands playback over when a cast
//! session starts or ends, and tells its caller which item is playing.
//!
//! ```no_run
//! use pmoplayer::backend::{SimulatedCastPlayer, SimulatedLocalPlayer, event_channel};
//! use pmoplayer::{ChannelListener, PlayerConfig, QueueCoordinator, default_samples};
//!
//! # fn main() -> pmoplayer::Result<()> {
//! let config = PlayerConfig::default();
//! let (tx, rx) = event_channel();
//! let (listener, positions) = ChannelListener::new();
//! let mut coordinator = QueueCoordinator::new(
//!     SimulatedLocalPlayer::new(tx.clone()),
//!     SimulatedCastPlayer::new(tx),
//!     rx,
//!     listener,
//!     &config,
//! )?;
//!
//! for sample in default_samples() {
//!     coordinator.add_item(sample)?;
//! }
//! coordinator.select_queue_item(1)?;
//! coordinator.process_events()?;
//! assert_eq!(positions.try_recv().unwrap().current, Some(1));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod event_logger;
pub mod model;
pub mod position;
pub mod reorder;
pub mod samples;
pub mod source;

pub use config::PlayerConfig;
pub use coordinator::QueueCoordinator;
pub use errors::{PlayerError, Result};
pub use event_logger::EventLogger;
pub use model::{
    BackendKind, MediaItem, PlaybackState, PlayerEvent, PlayerEventKind, RepeatMode, Timeline,
};
pub use position::{ChannelListener, QueuePositionChange, QueuePositionListener};
pub use reorder::{DragReorder, ReorderOutcome};
pub use samples::default_samples;
pub use source::{CastQueueItem, ConcatenatingSource, MediaSource, MediaSourceFactory, SourceContext};
