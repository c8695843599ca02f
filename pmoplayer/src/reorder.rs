//! Drag-to-reorder support for queue views.
//!
//! A drag gesture produces many visual moves (`on_move`) but the queue is
//! only edited once, when the gesture ends: the item picked up at the first
//! `from` position lands at the last `to` position.

use crate::backend::{CastPlayer, LocalPlayer};
use crate::coordinator::QueueCoordinator;
use crate::errors::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// No drag was in progress.
    Idle,
    Committed { from: usize, to: usize },
    /// The coordinator refused the move. Every visual move since the drag
    /// started is invalid: reload the whole view from the queue.
    Rejected,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DragReorder {
    from: Option<usize>,
    to: Option<usize>,
}

impl DragReorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.from.is_some()
    }

    /// Records one visual move of the dragged row.
    pub fn on_move(&mut self, from: usize, to: usize) {
        if self.from.is_none() {
            self.from = Some(from);
        }
        self.to = Some(to);
    }

    /// Ends the gesture and applies it to the queue.
    pub fn finish<L, R>(&mut self, coordinator: &mut QueueCoordinator<L, R>) -> Result<ReorderOutcome>
    where
        L: LocalPlayer,
        R: CastPlayer,
    {
        let (Some(from), Some(to)) = (self.from.take(), self.to.take()) else {
            return Ok(ReorderOutcome::Idle);
        };
        if coordinator.move_item(from, to)? {
            Ok(ReorderOutcome::Committed { from, to })
        } else {
            Ok(ReorderOutcome::Rejected)
        }
    }

    /// Removes the swiped row. Returns whether the view should drop it.
    pub fn on_swipe<L, R>(
        &mut self,
        coordinator: &mut QueueCoordinator<L, R>,
        index: usize,
    ) -> Result<bool>
    where
        L: LocalPlayer,
        R: CastPlayer,
    {
        coordinator.remove_item(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SimulatedCastPlayer, SimulatedLocalPlayer, event_channel};
    use crate::config::PlayerConfig;
    use crate::model::{MIME_TYPE_DASH, MediaItem};

    fn coordinator(names: &[&str]) -> QueueCoordinator<SimulatedLocalPlayer, SimulatedCastPlayer> {
        let (tx, rx) = event_channel();
        let mut coordinator = QueueCoordinator::new(
            SimulatedLocalPlayer::new(tx.clone()),
            SimulatedCastPlayer::new(tx),
            rx,
            |_: Option<usize>, _: Option<usize>| {},
            &PlayerConfig::default(),
        )
        .unwrap();
        for name in names {
            coordinator
                .add_item(MediaItem::new(
                    format!("https://example.com/{}.mpd", name),
                    *name,
                    MIME_TYPE_DASH,
                ))
                .unwrap();
        }
        coordinator
    }

    fn names(coordinator: &QueueCoordinator<SimulatedLocalPlayer, SimulatedCastPlayer>) -> Vec<String> {
        coordinator.items().iter().map(|i| i.name.clone()).collect()
    }

    #[test]
    fn test_idle_finish() {
        let mut coordinator = coordinator(&["a", "b"]);
        let mut drag = DragReorder::new();
        assert_eq!(drag.finish(&mut coordinator).unwrap(), ReorderOutcome::Idle);
    }

    #[test]
    fn test_gesture_is_applied_once() {
        let mut coordinator = coordinator(&["a", "b", "c", "d"]);
        let mut drag = DragReorder::new();
        drag.on_move(0, 1);
        drag.on_move(1, 2);
        drag.on_move(2, 3);
        assert!(drag.is_dragging());

        let outcome = drag.finish(&mut coordinator).unwrap();
        assert_eq!(outcome, ReorderOutcome::Committed { from: 0, to: 3 });
        assert_eq!(names(&coordinator), vec!["b", "c", "d", "a"]);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_rejected_move_when_remote_is_behind() {
        let (tx, rx) = event_channel();
        let remote = SimulatedCastPlayer::with_session(tx.clone());
        let receiver = remote.driver();
        let mut coordinator = QueueCoordinator::new(
            SimulatedLocalPlayer::new(tx),
            remote,
            rx,
            |_: Option<usize>, _: Option<usize>| {},
            &PlayerConfig::default(),
        )
        .unwrap();
        for name in ["a", "b", "c"] {
            coordinator
                .add_item(MediaItem::new(format!("https://example.com/{}", name), name, MIME_TYPE_DASH))
                .unwrap();
        }
        coordinator.select_queue_item(0).unwrap();

        // Another sender drops the last item straight on the receiver.
        let last = receiver.timeline().periods[2].id;
        receiver.remove_on_receiver(last).unwrap();

        let mut drag = DragReorder::new();
        drag.on_move(2, 1);
        drag.on_move(1, 0);
        assert_eq!(drag.finish(&mut coordinator).unwrap(), ReorderOutcome::Rejected);
        assert_eq!(names(&coordinator), vec!["a", "b", "c"]);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_swipe_removes() {
        let mut coordinator = coordinator(&["a", "b"]);
        let mut drag = DragReorder::new();
        assert!(drag.on_swipe(&mut coordinator, 0).unwrap());
        assert_eq!(names(&coordinator), vec!["b"]);
    }
}
