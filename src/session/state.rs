//! Session state machine
//!
//! Tracks a subscriber session from validation to teardown.

use crate::stats::SessionStats;

use super::stream::SessionEnd;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Request accepted, not yet registered
    Start,
    /// Registered with the hub, queue handle held
    Registered,
    /// Draining the queue and delivering
    Streaming,
    /// Registration removed
    Closed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    pub subscriber_id: String,
    pub phase: SessionPhase,
    pub stats: SessionStats,
    /// Why the session ended, if it ended normally
    pub end: Option<SessionEnd>,
}

impl SessionState {
    pub fn new(subscriber_id: impl Into<String>) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            phase: SessionPhase::Start,
            stats: SessionStats::new(),
            end: None,
        }
    }

    pub fn on_registered(&mut self) {
        if self.phase == SessionPhase::Start {
            self.phase = SessionPhase::Registered;
        }
    }

    pub fn start_streaming(&mut self) {
        if self.phase == SessionPhase::Registered {
            self.phase = SessionPhase::Streaming;
        }
    }

    pub fn on_delivered(&mut self) {
        self.stats.delivered += 1;
    }

    pub fn on_filtered(&mut self) {
        self.stats.filtered += 1;
    }

    /// Enter the terminal phase
    pub fn close(&mut self, end: Option<SessionEnd>) {
        self.phase = SessionPhase::Closed;
        self.end = end;
        self.stats.finish();
    }

    pub fn is_streaming(&self) -> bool {
        self.phase == SessionPhase::Streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut state = SessionState::new("c1");
        assert_eq!(state.phase, SessionPhase::Start);

        // Cannot stream before registering
        state.start_streaming();
        assert_eq!(state.phase, SessionPhase::Start);

        state.on_registered();
        assert_eq!(state.phase, SessionPhase::Registered);

        state.start_streaming();
        assert!(state.is_streaming());

        state.on_delivered();
        state.on_filtered();
        state.on_filtered();

        state.close(Some(SessionEnd::Cancelled));
        assert_eq!(state.phase, SessionPhase::Closed);
        assert_eq!(state.end, Some(SessionEnd::Cancelled));
        assert_eq!(state.stats.delivered, 1);
        assert_eq!(state.stats.filtered, 2);
    }
}
