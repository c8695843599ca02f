//! Queue position notifications.
//!
//! The caller learns about the playing item through a single callback,
//! [`QueuePositionListener::on_queue_position_changed`]. The coordinator
//! recomputes the current index far more often than it changes (every
//! backend event triggers a recompute), so changes go through a
//! [`CurrentIndexTracker`] which only reports actual transitions.

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::trace;

/// A transition of the current queue index. `None` means no item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuePositionChange {
    pub previous: Option<usize>,
    pub current: Option<usize>,
}

pub trait QueuePositionListener {
    /// Called when the currently played item of the media queue changes.
    fn on_queue_position_changed(&mut self, previous: Option<usize>, current: Option<usize>);
}

impl<F> QueuePositionListener for F
where
    F: FnMut(Option<usize>, Option<usize>),
{
    fn on_queue_position_changed(&mut self, previous: Option<usize>, current: Option<usize>) {
        self(previous, current)
    }
}

/// Forwards every change on a crossbeam channel.
#[derive(Clone, Debug)]
pub struct ChannelListener {
    tx: Sender<QueuePositionChange>,
}

impl ChannelListener {
    pub fn new() -> (Self, Receiver<QueuePositionChange>) {
        let (tx, rx) = unbounded::<QueuePositionChange>();
        (Self { tx }, rx)
    }
}

impl QueuePositionListener for ChannelListener {
    fn on_queue_position_changed(&mut self, previous: Option<usize>, current: Option<usize>) {
        if self.tx.send(QueuePositionChange { previous, current }).is_err() {
            trace!("queue position change dropped, no receiver");
        }
    }
}

/// Compare-before-notify holder for the current index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurrentIndexTracker {
    current: Option<usize>,
}

impl CurrentIndexTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<usize> {
        self.current
    }

    /// Stores `index` and returns the transition if it differs from the
    /// stored value.
    pub fn update(&mut self, index: Option<usize>) -> Option<QueuePositionChange> {
        if self.current == index {
            return None;
        }
        let previous = std::mem::replace(&mut self.current, index);
        Some(QueuePositionChange {
            previous,
            current: index,
        })
    }

    /// Resets to `None` without reporting a transition.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_reports_only_changes() {
        let mut tracker = CurrentIndexTracker::new();
        assert_eq!(tracker.update(None), None);
        assert_eq!(
            tracker.update(Some(2)),
            Some(QueuePositionChange {
                previous: None,
                current: Some(2)
            })
        );
        assert_eq!(tracker.update(Some(2)), None);
        assert_eq!(
            tracker.update(Some(3)),
            Some(QueuePositionChange {
                previous: Some(2),
                current: Some(3)
            })
        );
        assert_eq!(tracker.get(), Some(3));

        tracker.clear();
        assert_eq!(tracker.get(), None);
    }

    #[test]
    fn test_channel_listener() {
        let (mut listener, rx) = ChannelListener::new();
        listener.on_queue_position_changed(None, Some(0));
        listener.on_queue_position_changed(Some(0), Some(1));
        let changes: Vec<QueuePositionChange> = rx.try_iter().collect();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].previous, Some(0));
        assert_eq!(changes[1].current, Some(1));
    }

    #[test]
    fn test_closure_listener() {
        let mut seen = Vec::new();
        {
            let mut listener = |prev: Option<usize>, new: Option<usize>| seen.push((prev, new));
            listener.on_queue_position_changed(Some(1), None);
        }
        assert_eq!(seen, vec![(Some(1), None)]);
    }
}
