//! In-memory backends.
//!
//! `SimulatedLocalPlayer` and `SimulatedCastPlayer` behave like the real
//! engines as far as the coordinator can observe: they keep a timeline,
//! a playing item, a playback state and a play-when-ready flag, and they
//! emit [`PlayerEvent`]s on a crossbeam channel for every change. Every
//! command received is recorded so callers can check what was sent.
//!
//! The player itself is handed to the coordinator, which owns it. What the
//! engine or the cast framework would do on its own (an item finishing, a
//! session starting, another sender editing the receiver queue) goes
//! through a [`LocalDriver`] or [`CastDriver`] taken before the hand-off.
//! Both halves share the same state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, trace};

use crate::backend::{CastPlayer, LocalPlayer, Player};
use crate::errors::{PlayerError, Result};
use crate::model::{
    BackendKind, DiscontinuityReason, Period, PlaybackState, PlayerEvent, PlayerEventKind,
    RepeatMode, Timeline,
};
use crate::source::{CastQueueItem, ConcatenatingSource};

/// Creates the channel backends use to report events to the coordinator.
pub fn event_channel() -> (Sender<PlayerEvent>, Receiver<PlayerEvent>) {
    unbounded::<PlayerEvent>()
}

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sending half of the event channel, tagged with the emitting backend.
#[derive(Clone, Debug)]
pub struct EventSender {
    source: BackendKind,
    tx: Sender<PlayerEvent>,
}

impl EventSender {
    pub fn new(source: BackendKind, tx: Sender<PlayerEvent>) -> Self {
        Self { source, tx }
    }

    pub fn emit(&self, kind: PlayerEventKind) {
        if self.tx.send(PlayerEvent::new(self.source, kind)).is_err() {
            trace!(backend = %self.source, "event dropped, no receiver");
        }
    }
}

// =========================================================================
//  Local player
// =========================================================================

/// Command received by the simulated local player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalCommand {
    Prepare { segments: usize },
    SeekTo { window_index: usize, position: Option<Duration> },
    SetPlayWhenReady(bool),
    Stop,
    Release,
}

#[derive(Clone, Copy, Debug)]
struct PlayingSegment {
    uid: u32,
    index: usize,
}

#[derive(Debug)]
struct LocalState {
    events: EventSender,
    source: Option<ConcatenatingSource>,
    state: PlaybackState,
    play_when_ready: bool,
    playing: Option<PlayingSegment>,
    position: Duration,
    commands: Vec<LocalCommand>,
    released: bool,
}

impl LocalState {
    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.emit_state();
        }
    }

    fn finish_current_item(&mut self) {
        let timeline = self.current_timeline();
        match self.current_window_index() {
            Some(index) if index + 1 < timeline.period_count() => {
                self.playing = timeline.period(index + 1).map(|p| PlayingSegment {
                    uid: p.id,
                    index: index + 1,
                });
                self.position = Duration::ZERO;
                self.events.emit(PlayerEventKind::PositionDiscontinuity {
                    reason: DiscontinuityReason::PeriodTransition,
                });
            }
            _ => self.set_state(PlaybackState::Ended),
        }
    }

    fn emit_state(&self) {
        self.events.emit(PlayerEventKind::StateChanged {
            play_when_ready: self.play_when_ready,
            state: self.state,
        });
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.released {
            Err(PlayerError::backend("local", "player released"))
        } else {
            Ok(())
        }
    }

    /// Resolves the playing segment against the live source. The segment
    /// is followed by uid so that queue edits around it keep it in place.
    /// When it was removed, playback moves on to whatever took its index.
    fn resolve(&self) -> Option<(usize, bool)> {
        let playing = self.playing?;
        let timeline = self.source.as_ref()?.timeline();
        if let Some(index) = timeline.periods.iter().position(|p| p.id == playing.uid) {
            return Some((index, false));
        }
        let len = timeline.period_count();
        if len == 0 {
            None
        } else if playing.index >= len {
            Some((len - 1, true))
        } else {
            Some((playing.index, false))
        }
    }

    fn playback_state(&self) -> PlaybackState {
        match (self.state, self.resolve()) {
            (PlaybackState::Idle, _) => PlaybackState::Idle,
            (_, Some((_, true))) => PlaybackState::Ended,
            (_, None) if self.source.is_some() => PlaybackState::Ended,
            (state, _) => state,
        }
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<()> {
        self.ensure_alive()?;
        self.commands.push(LocalCommand::SetPlayWhenReady(play_when_ready));
        if self.play_when_ready != play_when_ready {
            self.play_when_ready = play_when_ready;
            self.emit_state();
        }
        Ok(())
    }

    fn current_window_index(&self) -> Option<usize> {
        self.resolve().map(|(index, _)| index)
    }

    fn current_timeline(&self) -> Timeline {
        self.source
            .as_ref()
            .map(ConcatenatingSource::timeline)
            .unwrap_or_default()
    }

    fn seek_to(&mut self, window_index: usize, position: Option<Duration>) -> Result<()> {
        self.ensure_alive()?;
        self.commands.push(LocalCommand::SeekTo {
            window_index,
            position,
        });

        let timeline = self.current_timeline();
        let period = timeline.period(window_index).ok_or_else(|| {
            PlayerError::backend(
                "local",
                &format!(
                    "seek to window {} outside timeline of {} periods",
                    window_index,
                    timeline.period_count()
                ),
            )
        })?;

        self.playing = Some(PlayingSegment {
            uid: period.id,
            index: window_index,
        });
        self.position = position.unwrap_or(Duration::ZERO);
        self.events.emit(PlayerEventKind::PositionDiscontinuity {
            reason: DiscontinuityReason::Seek,
        });
        if self.state == PlaybackState::Ended {
            self.set_state(PlaybackState::Ready);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.commands.push(LocalCommand::Stop);
        self.set_state(PlaybackState::Idle);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.commands.push(LocalCommand::Release);
        self.released = true;
        self.source = None;
        self.playing = None;
        self.state = PlaybackState::Idle;
        debug!("local player released");
        Ok(())
    }

    fn prepare(&mut self, source: ConcatenatingSource) -> Result<()> {
        self.ensure_alive()?;
        let timeline = source.timeline();
        self.commands.push(LocalCommand::Prepare {
            segments: timeline.period_count(),
        });

        self.playing = timeline.period(0).map(|p| PlayingSegment { uid: p.id, index: 0 });
        self.position = Duration::ZERO;
        self.source = Some(source);
        self.events
            .emit(PlayerEventKind::TimelineChanged { timeline: timeline.clone() });

        self.state = if timeline.is_empty() {
            PlaybackState::Ended
        } else {
            PlaybackState::Ready
        };
        self.emit_state();
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimulatedLocalPlayer {
    state: Arc<Mutex<LocalState>>,
}

impl SimulatedLocalPlayer {
    pub fn new(tx: Sender<PlayerEvent>) -> Self {
        let state = LocalState {
            events: EventSender::new(BackendKind::Local, tx),
            source: None,
            state: PlaybackState::Idle,
            play_when_ready: false,
            playing: None,
            position: Duration::ZERO,
            commands: Vec::new(),
            released: false,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Handle on the engine side of this player.
    pub fn driver(&self) -> LocalDriver {
        LocalDriver {
            state: Arc::clone(&self.state),
        }
    }
}

impl Player for SimulatedLocalPlayer {
    fn playback_state(&self) -> PlaybackState {
        lock(&self.state).playback_state()
    }

    fn play_when_ready(&self) -> bool {
        lock(&self.state).play_when_ready
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<()> {
        lock(&self.state).set_play_when_ready(play_when_ready)
    }

    fn current_window_index(&self) -> Option<usize> {
        lock(&self.state).current_window_index()
    }

    fn current_position(&self) -> Option<Duration> {
        let state = lock(&self.state);
        state.playing.map(|_| state.position)
    }

    fn current_timeline(&self) -> Timeline {
        lock(&self.state).current_timeline()
    }

    fn seek_to(&mut self, window_index: usize, position: Option<Duration>) -> Result<()> {
        lock(&self.state).seek_to(window_index, position)
    }

    fn stop(&mut self) -> Result<()> {
        lock(&self.state).stop()
    }

    fn release(&mut self) -> Result<()> {
        lock(&self.state).release()
    }
}

impl LocalPlayer for SimulatedLocalPlayer {
    fn prepare(&mut self, source: ConcatenatingSource) -> Result<()> {
        lock(&self.state).prepare(source)
    }
}

/// Engine side of a [`SimulatedLocalPlayer`]: inspection plus what the
/// engine or the user on the device does without the coordinator.
#[derive(Clone, Debug)]
pub struct LocalDriver {
    state: Arc<Mutex<LocalState>>,
}

impl LocalDriver {
    pub fn commands(&self) -> Vec<LocalCommand> {
        lock(&self.state).commands.clone()
    }

    pub fn take_commands(&self) -> Vec<LocalCommand> {
        std::mem::take(&mut lock(&self.state).commands)
    }

    /// The source the player was prepared with.
    pub fn source(&self) -> Option<ConcatenatingSource> {
        lock(&self.state).source.clone()
    }

    pub fn is_released(&self) -> bool {
        lock(&self.state).released
    }

    pub fn playback_state(&self) -> PlaybackState {
        lock(&self.state).playback_state()
    }

    pub fn current_window_index(&self) -> Option<usize> {
        lock(&self.state).current_window_index()
    }

    /// Sets the playback position without emitting anything, as the clock
    /// advancing would.
    pub fn set_position(&self, position: Duration) {
        lock(&self.state).position = position;
    }

    /// Forces the playback state and reports it.
    pub fn set_state(&self, state: PlaybackState) {
        lock(&self.state).set_state(state);
    }

    /// Play or pause pressed on the device.
    pub fn set_play_when_ready(&self, play_when_ready: bool) {
        let mut state = lock(&self.state);
        if state.play_when_ready != play_when_ready {
            state.play_when_ready = play_when_ready;
            state.emit_state();
        }
    }

    /// Simulates the end of the playing item: advances to the next window
    /// or ends playback on the last one.
    pub fn finish_current_item(&self) {
        lock(&self.state).finish_current_item();
    }
}

// =========================================================================
//  Cast player
// =========================================================================

/// Command received by the simulated cast player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CastCommand {
    AddItems { items: Vec<CastQueueItem> },
    RemoveItem { item_id: u32 },
    MoveItem { item_id: u32, new_index: usize },
    LoadItems {
        items: Vec<CastQueueItem>,
        start_index: usize,
        position: Option<Duration>,
        repeat_mode: RepeatMode,
    },
    SeekTo { window_index: usize, position: Option<Duration> },
    SetPlayWhenReady(bool),
    Stop,
    Release,
}

#[derive(Debug)]
struct CastState {
    events: EventSender,
    session_available: bool,
    session_listener: bool,
    queue: Vec<CastQueueItem>,
    next_item_id: u32,
    current_item_id: Option<u32>,
    state: PlaybackState,
    play_when_ready: bool,
    position: Duration,
    repeat_mode: RepeatMode,
    commands: Vec<CastCommand>,
    released: bool,
}

impl CastState {
    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.emit_state();
        }
    }

    fn emit_state(&self) {
        self.events.emit(PlayerEventKind::StateChanged {
            play_when_ready: self.play_when_ready,
            state: self.state,
        });
    }

    fn emit_timeline(&self) {
        self.events.emit(PlayerEventKind::TimelineChanged {
            timeline: self.current_timeline(),
        });
    }

    fn ensure_not_released(&self) -> Result<()> {
        if self.released {
            Err(PlayerError::backend("cast", "player released"))
        } else {
            Ok(())
        }
    }

    fn ensure_session(&self) -> Result<()> {
        self.ensure_not_released()?;
        if !self.session_available {
            return Err(PlayerError::backend("cast", "no cast session"));
        }
        Ok(())
    }

    fn assign_id(&mut self, mut item: CastQueueItem) -> CastQueueItem {
        item.item_id = Some(self.next_item_id);
        self.next_item_id += 1;
        item
    }

    fn position_of(&self, item_id: u32) -> Option<usize> {
        self.queue.iter().position(|i| i.item_id == Some(item_id))
    }

    fn current_window_index(&self) -> Option<usize> {
        self.current_item_id.and_then(|id| self.position_of(id))
    }

    fn current_timeline(&self) -> Timeline {
        Timeline {
            periods: self
                .queue
                .iter()
                .filter_map(|item| item.item_id.map(|id| Period { id, duration: None }))
                .collect(),
        }
    }

    fn finish_current_item(&mut self) {
        match self.current_window_index() {
            Some(index) if index + 1 < self.queue.len() => {
                self.current_item_id = self.queue[index + 1].item_id;
                self.position = Duration::ZERO;
                self.events.emit(PlayerEventKind::PositionDiscontinuity {
                    reason: DiscontinuityReason::PeriodTransition,
                });
            }
            _ => self.set_state(PlaybackState::Ended),
        }
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<()> {
        self.ensure_session()?;
        self.commands.push(CastCommand::SetPlayWhenReady(play_when_ready));
        if self.play_when_ready != play_when_ready {
            self.play_when_ready = play_when_ready;
            self.emit_state();
        }
        Ok(())
    }

    fn seek_to(&mut self, window_index: usize, position: Option<Duration>) -> Result<()> {
        self.ensure_session()?;
        self.commands.push(CastCommand::SeekTo {
            window_index,
            position,
        });
        let item_id = self
            .queue
            .get(window_index)
            .and_then(|item| item.item_id)
            .ok_or_else(|| {
                PlayerError::backend("cast", &format!("no queue item at window {}", window_index))
            })?;
        self.current_item_id = Some(item_id);
        self.position = position.unwrap_or(Duration::ZERO);
        self.events.emit(PlayerEventKind::PositionDiscontinuity {
            reason: DiscontinuityReason::Seek,
        });
        self.set_state(PlaybackState::Ready);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.ensure_not_released()?;
        self.commands.push(CastCommand::Stop);
        self.set_state(PlaybackState::Idle);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.ensure_not_released()?;
        self.commands.push(CastCommand::Release);
        self.released = true;
        self.queue.clear();
        self.current_item_id = None;
        self.state = PlaybackState::Idle;
        debug!("cast player released");
        Ok(())
    }

    fn add_items(&mut self, items: &[CastQueueItem]) -> Result<()> {
        self.ensure_session()?;
        self.commands.push(CastCommand::AddItems {
            items: items.to_vec(),
        });
        for item in items {
            let item = self.assign_id(item.clone());
            self.queue.push(item);
        }
        self.emit_timeline();
        Ok(())
    }

    /// Drops `item_id` from the receiver queue without recording a command.
    fn drop_item(&mut self, item_id: u32) -> Result<()> {
        let index = self.position_of(item_id).ok_or_else(|| {
            PlayerError::backend("cast", &format!("unknown queue item {}", item_id))
        })?;
        self.queue.remove(index);

        if self.current_item_id == Some(item_id) {
            // The receiver carries on with the item that took the slot.
            match self.queue.get(index) {
                Some(next) => {
                    self.current_item_id = next.item_id;
                    self.position = Duration::ZERO;
                }
                None => {
                    self.current_item_id = None;
                    self.state = PlaybackState::Ended;
                    self.emit_state();
                }
            }
        }
        self.emit_timeline();
        Ok(())
    }

    fn remove_item(&mut self, item_id: u32) -> Result<()> {
        self.ensure_session()?;
        self.commands.push(CastCommand::RemoveItem { item_id });
        self.drop_item(item_id)
    }

    fn move_item(&mut self, item_id: u32, new_index: usize) -> Result<()> {
        self.ensure_session()?;
        self.commands.push(CastCommand::MoveItem { item_id, new_index });
        let index = self.position_of(item_id).ok_or_else(|| {
            PlayerError::backend("cast", &format!("unknown queue item {}", item_id))
        })?;
        let item = self.queue.remove(index);
        let target = new_index.min(self.queue.len());
        self.queue.insert(target, item);
        self.emit_timeline();
        Ok(())
    }

    fn load_items(
        &mut self,
        items: &[CastQueueItem],
        start_index: usize,
        position: Option<Duration>,
        repeat_mode: RepeatMode,
    ) -> Result<()> {
        self.ensure_session()?;
        self.commands.push(CastCommand::LoadItems {
            items: items.to_vec(),
            start_index,
            position,
            repeat_mode,
        });

        let queue: Vec<CastQueueItem> = items
            .iter()
            .cloned()
            .map(|item| self.assign_id(item))
            .collect();
        self.queue = queue;
        self.current_item_id = self.queue.get(start_index).and_then(|i| i.item_id);
        self.position = position.unwrap_or(Duration::ZERO);
        if self.repeat_mode != repeat_mode {
            self.repeat_mode = repeat_mode;
            self.events
                .emit(PlayerEventKind::RepeatModeChanged { mode: repeat_mode });
        }
        self.emit_timeline();

        let state = if self.current_item_id.is_some() {
            PlaybackState::Ready
        } else {
            PlaybackState::Idle
        };
        self.set_state(state);
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimulatedCastPlayer {
    state: Arc<Mutex<CastState>>,
}

impl SimulatedCastPlayer {
    pub fn new(tx: Sender<PlayerEvent>) -> Self {
        let state = CastState {
            events: EventSender::new(BackendKind::Remote, tx),
            session_available: false,
            session_listener: true,
            queue: Vec::new(),
            next_item_id: 1,
            current_item_id: None,
            state: PlaybackState::Idle,
            play_when_ready: false,
            position: Duration::ZERO,
            repeat_mode: RepeatMode::Off,
            commands: Vec::new(),
            released: false,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A cast player whose session is already up when the coordinator
    /// starts.
    pub fn with_session(tx: Sender<PlayerEvent>) -> Self {
        let player = Self::new(tx);
        lock(&player.state).session_available = true;
        player
    }

    /// Handle on the cast framework and receiver side of this player.
    pub fn driver(&self) -> CastDriver {
        CastDriver {
            state: Arc::clone(&self.state),
        }
    }
}

impl Player for SimulatedCastPlayer {
    fn playback_state(&self) -> PlaybackState {
        lock(&self.state).state
    }

    fn play_when_ready(&self) -> bool {
        lock(&self.state).play_when_ready
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<()> {
        lock(&self.state).set_play_when_ready(play_when_ready)
    }

    fn current_window_index(&self) -> Option<usize> {
        lock(&self.state).current_window_index()
    }

    fn current_position(&self) -> Option<Duration> {
        let state = lock(&self.state);
        state.current_item_id.map(|_| state.position)
    }

    fn current_timeline(&self) -> Timeline {
        lock(&self.state).current_timeline()
    }

    fn seek_to(&mut self, window_index: usize, position: Option<Duration>) -> Result<()> {
        lock(&self.state).seek_to(window_index, position)
    }

    fn stop(&mut self) -> Result<()> {
        lock(&self.state).stop()
    }

    fn release(&mut self) -> Result<()> {
        lock(&self.state).release()
    }
}

impl CastPlayer for SimulatedCastPlayer {
    fn is_session_available(&self) -> bool {
        lock(&self.state).session_available
    }

    fn add_items(&mut self, items: &[CastQueueItem]) -> Result<()> {
        lock(&self.state).add_items(items)
    }

    fn remove_item(&mut self, item_id: u32) -> Result<()> {
        lock(&self.state).remove_item(item_id)
    }

    fn move_item(&mut self, item_id: u32, new_index: usize) -> Result<()> {
        lock(&self.state).move_item(item_id, new_index)
    }

    fn load_items(
        &mut self,
        items: &[CastQueueItem],
        start_index: usize,
        position: Option<Duration>,
        repeat_mode: RepeatMode,
    ) -> Result<()> {
        lock(&self.state).load_items(items, start_index, position, repeat_mode)
    }

    fn clear_session_listener(&mut self) {
        lock(&self.state).session_listener = false;
    }
}

/// Cast framework and receiver side of a [`SimulatedCastPlayer`].
#[derive(Clone, Debug)]
pub struct CastDriver {
    state: Arc<Mutex<CastState>>,
}

impl CastDriver {
    pub fn commands(&self) -> Vec<CastCommand> {
        lock(&self.state).commands.clone()
    }

    pub fn take_commands(&self) -> Vec<CastCommand> {
        std::mem::take(&mut lock(&self.state).commands)
    }

    /// Items currently queued on the receiver.
    pub fn queue(&self) -> Vec<CastQueueItem> {
        lock(&self.state).queue.clone()
    }

    pub fn timeline(&self) -> Timeline {
        lock(&self.state).current_timeline()
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        lock(&self.state).repeat_mode
    }

    pub fn is_released(&self) -> bool {
        lock(&self.state).released
    }

    pub fn is_session_available(&self) -> bool {
        lock(&self.state).session_available
    }

    pub fn playback_state(&self) -> PlaybackState {
        lock(&self.state).state
    }

    pub fn current_window_index(&self) -> Option<usize> {
        lock(&self.state).current_window_index()
    }

    pub fn set_position(&self, position: Duration) {
        lock(&self.state).position = position;
    }

    pub fn set_state(&self, state: PlaybackState) {
        lock(&self.state).set_state(state);
    }

    /// Simulates a cast session starting.
    pub fn connect_session(&self) {
        let mut state = lock(&self.state);
        state.session_available = true;
        if state.session_listener {
            state.events.emit(PlayerEventKind::SessionAvailable);
        }
    }

    /// Simulates the cast session ending. The last known receiver state is
    /// kept until the coordinator stops the player.
    pub fn disconnect_session(&self) {
        let mut state = lock(&self.state);
        state.session_available = false;
        if state.session_listener {
            state.events.emit(PlayerEventKind::SessionUnavailable);
        }
    }

    /// Simulates the receiver dropping its whole queue.
    pub fn clear_receiver_queue(&self) {
        let mut state = lock(&self.state);
        state.queue.clear();
        state.current_item_id = None;
        state.emit_timeline();
        state.set_state(PlaybackState::Idle);
    }

    /// Another sender removes `item_id` straight on the receiver.
    pub fn remove_on_receiver(&self, item_id: u32) -> Result<()> {
        lock(&self.state).drop_item(item_id)
    }

    pub fn finish_current_item(&self) {
        lock(&self.state).finish_current_item();
    }

    /// The cast framework tears the player down on its own.
    pub fn release(&self) -> Result<()> {
        lock(&self.state).release()
    }
}
