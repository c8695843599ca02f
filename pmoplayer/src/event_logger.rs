//! Debug logging of backend events.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::model::{PlayerEvent, PlayerEventKind, Timeline};

pub const DEFAULT_MAX_TIMELINE_LINES: usize = 3;

#[derive(Debug)]
pub struct EventLogger {
    start: Instant,
    max_timeline_lines: usize,
}

impl EventLogger {
    pub fn new(max_timeline_lines: usize) -> Self {
        Self {
            start: Instant::now(),
            max_timeline_lines,
        }
    }

    pub fn log(&self, event: &PlayerEvent) {
        for line in self.describe(event) {
            debug!(backend = %event.source, "{}", line);
        }
    }

    /// Renders `event` as log lines.
    pub fn describe(&self, event: &PlayerEvent) -> Vec<String> {
        let session = time_string(Some(self.start.elapsed()));
        match &event.kind {
            PlayerEventKind::StateChanged {
                play_when_ready,
                state,
            } => vec![format!(
                "state [{}, {}, {}]",
                session,
                play_when_ready,
                state.short_code()
            )],
            PlayerEventKind::PositionDiscontinuity { reason } => {
                vec![format!("discontinuity [{}, {}]", session, reason.as_str())]
            }
            PlayerEventKind::TimelineChanged { timeline } => self.describe_timeline(timeline),
            PlayerEventKind::RepeatModeChanged { mode } => {
                vec![format!("repeatMode [{}]", mode.as_str())]
            }
            PlayerEventKind::SessionAvailable => vec![format!("castSession [{}, available]", session)],
            PlayerEventKind::SessionUnavailable => {
                vec![format!("castSession [{}, unavailable]", session)]
            }
        }
    }

    fn describe_timeline(&self, timeline: &Timeline) -> Vec<String> {
        let count = timeline.period_count();
        let mut lines = Vec::with_capacity(self.max_timeline_lines + 2);
        lines.push(format!("sourceInfo [periodCount={}", count));
        for period in timeline.periods.iter().take(self.max_timeline_lines) {
            lines.push(format!("  period [{}, id={}]", time_string(period.duration), period.id));
        }
        if count > self.max_timeline_lines {
            lines.push("  ...".to_string());
        }
        lines.push("]".to_string());
        lines
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TIMELINE_LINES)
    }
}

/// Seconds with two decimals, `?` when unknown.
fn time_string(time: Option<Duration>) -> String {
    match time {
        Some(t) => format!("{:.2}", t.as_secs_f64()),
        None => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackendKind, DiscontinuityReason, Period, PlaybackState, RepeatMode};

    #[test]
    fn test_time_string() {
        assert_eq!(time_string(None), "?");
        assert_eq!(time_string(Some(Duration::from_millis(1234))), "1.23");
        assert_eq!(time_string(Some(Duration::ZERO)), "0.00");
    }

    #[test]
    fn test_state_line() {
        let logger = EventLogger::default();
        let lines = logger.describe(&PlayerEvent::new(
            BackendKind::Local,
            PlayerEventKind::StateChanged {
                play_when_ready: true,
                state: PlaybackState::Buffering,
            },
        ));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("state ["));
        assert!(lines[0].ends_with(", true, B]"));
    }

    #[test]
    fn test_timeline_is_elided() {
        let logger = EventLogger::new(2);
        let timeline = Timeline {
            periods: (0..5)
                .map(|id| Period {
                    id,
                    duration: Some(Duration::from_secs(10)),
                })
                .collect(),
        };
        let lines = logger.describe(&PlayerEvent::new(
            BackendKind::Remote,
            PlayerEventKind::TimelineChanged { timeline },
        ));
        assert_eq!(
            lines,
            vec![
                "sourceInfo [periodCount=5".to_string(),
                "  period [10.00, id=0]".to_string(),
                "  period [10.00, id=1]".to_string(),
                "  ...".to_string(),
                "]".to_string(),
            ]
        );
    }

    #[test]
    fn test_other_lines() {
        let logger = EventLogger::default();
        let repeat = logger.describe(&PlayerEvent::new(
            BackendKind::Remote,
            PlayerEventKind::RepeatModeChanged {
                mode: RepeatMode::All,
            },
        ));
        assert_eq!(repeat, vec!["repeatMode [ALL]".to_string()]);

        let seek = logger.describe(&PlayerEvent::new(
            BackendKind::Local,
            PlayerEventKind::PositionDiscontinuity {
                reason: DiscontinuityReason::Seek,
            },
        ));
        assert!(seek[0].ends_with(", SEEK]"));
    }
}
