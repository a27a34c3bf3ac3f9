use crate::clock::{Clock, SystemClock};
use crate::drill::DrillItem;
use crate::engine::{IgnoreReason, KeystrokeOutcome, KeystrokeResult, SessionState};
use crate::error::{InvalidInputSnafu, InvalidStateSnafu, Result};
use crate::metrics::{build_session_result, compute_live_stats, LiveStats, SessionResult};
use chrono::{DateTime, Local};
use log::{debug, info};
use snafu::OptionExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Lifecycle {
    Idle,
    Active,
    Paused,
    Stopped,
}

/// Change notifications delivered to listeners
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started { total_characters: usize },
    Paused,
    Resumed,
    Keystroke(KeystrokeOutcome),
    Stopped(Box<SessionResult>),
}

type Listener = Box<dyn FnMut(&SessionEvent)>;

/// Owns one drill from start to stop.
///
/// A session is single use: once stopped, practice continues with a new
/// `Session`. Completing the last character stops it automatically and the
/// result is then available from [`Session::result`].
pub struct Session<C: Clock = SystemClock> {
    clock: C,
    lifecycle: Lifecycle,
    state: Option<SessionState>,
    started_at: Option<DateTime<Local>>,
    time_limit_ms: Option<u64>,
    paused_at_ms: Option<u64>,
    stopped_at_ms: Option<u64>,
    result: Option<SessionResult>,
    listeners: Vec<Listener>,
}

impl Session<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Session<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Session<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            lifecycle: Lifecycle::Idle,
            state: None,
            started_at: None,
            time_limit_ms: None,
            paused_at_ms: None,
            stopped_at_ms: None,
            result: None,
            listeners: Vec::new(),
        }
    }

    /// Cap on active practice time, checked by [`Session::time_limit_reached`]
    pub fn with_time_limit(mut self, limit_ms: Option<u64>) -> Self {
        self.time_limit_ms = limit_ms;
        self
    }

    pub fn on_change<F>(&mut self, listener: F)
    where
        F: FnMut(&SessionEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn time_limit_ms(&self) -> Option<u64> {
        self.time_limit_ms
    }

    pub fn start(&mut self, items: Vec<DrillItem>) -> Result<()> {
        if items.is_empty() {
            return InvalidInputSnafu {
                reason: "practice text is empty",
            }
            .fail();
        }
        self.ensure(Lifecycle::Idle, "start")?;

        let total_characters = items.len();
        self.state = Some(SessionState::new(items, self.clock.now_ms()));
        self.started_at = Some(Local::now());
        self.lifecycle = Lifecycle::Active;
        info!("session started with {total_characters} characters");
        self.notify(&SessionEvent::Started { total_characters });
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure(Lifecycle::Active, "pause")?;
        self.paused_at_ms = Some(self.clock.now_ms());
        self.lifecycle = Lifecycle::Paused;
        debug!("session paused");
        self.notify(&SessionEvent::Paused);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.ensure(Lifecycle::Paused, "resume")?;
        self.close_pause();
        self.lifecycle = Lifecycle::Active;
        debug!("session resumed");
        self.notify(&SessionEvent::Resumed);
        Ok(())
    }

    /// Pause when active, resume when paused
    pub fn toggle_pause(&mut self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Paused => self.resume(),
            _ => self.pause(),
        }
    }

    /// Finalize the session. A second call fails and leaves the first result intact.
    pub fn stop(&mut self) -> Result<SessionResult> {
        let state = self.lifecycle.to_string();
        if !matches!(self.lifecycle, Lifecycle::Active | Lifecycle::Paused) {
            return InvalidStateSnafu {
                operation: "stop",
                state,
            }
            .fail();
        }
        self.finish();
        self.result.clone().context(InvalidStateSnafu {
            operation: "stop",
            state,
        })
    }

    /// Forward a keystroke stamped with the session clock
    pub fn press(&mut self, key: &str) -> KeystrokeResult {
        let now = self.clock.now_ms();
        self.handle_keystroke(key, now)
    }

    /// Forward a keystroke to the state machine; ignored unless active
    pub fn handle_keystroke(&mut self, key: &str, timestamp_ms: u64) -> KeystrokeResult {
        let state = match (self.lifecycle, self.state.as_mut()) {
            (Lifecycle::Active, Some(state)) => state,
            _ => return KeystrokeResult::Ignored(IgnoreReason::NotActive),
        };

        let result = state.handle_keystroke(key, timestamp_ms);
        if let KeystrokeResult::Processed(outcome) = &result {
            let session_completed = outcome.session_completed;
            self.notify(&SessionEvent::Keystroke(outcome.clone()));
            if session_completed {
                self.stopped_at_ms = Some(timestamp_ms.max(self.clock.now_ms()));
                self.finish();
            }
        }
        result
    }

    /// Snapshot for display; time stands still while paused or stopped
    pub fn live_stats(&self) -> Option<LiveStats> {
        let state = self.state.as_ref()?;
        let mut stats = compute_live_stats(state, self.effective_now_ms());
        stats.remaining_ms = self
            .time_limit_ms
            .map(|limit| limit.saturating_sub(stats.elapsed_ms));
        Some(stats)
    }

    pub fn time_limit_reached(&self) -> bool {
        match (self.time_limit_ms, self.state.as_ref()) {
            (Some(limit), Some(state)) => state.active_elapsed_ms(self.effective_now_ms()) >= limit,
            _ => false,
        }
    }

    fn effective_now_ms(&self) -> u64 {
        match self.lifecycle {
            Lifecycle::Paused => self.paused_at_ms.unwrap_or_else(|| self.clock.now_ms()),
            Lifecycle::Stopped => self.stopped_at_ms.unwrap_or_else(|| self.clock.now_ms()),
            _ => self.clock.now_ms(),
        }
    }

    fn ensure(&self, expected: Lifecycle, operation: &str) -> Result<()> {
        if self.lifecycle != expected {
            return InvalidStateSnafu {
                operation,
                state: self.lifecycle.to_string(),
            }
            .fail();
        }
        Ok(())
    }

    fn close_pause(&mut self) {
        if let Some(paused_at) = self.paused_at_ms.take() {
            let now = self.clock.now_ms();
            if let Some(state) = self.state.as_mut() {
                state.add_paused(now.saturating_sub(paused_at), now);
            }
        }
    }

    /// Build the result and move to `Stopped`; does nothing before `start`
    fn finish(&mut self) {
        if self.lifecycle == Lifecycle::Paused {
            self.close_pause();
        }
        let now = *self.stopped_at_ms.get_or_insert_with(|| self.clock.now_ms());
        let started_at = self.started_at.unwrap_or_else(Local::now);
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let result = build_session_result(state, now, started_at);

        self.lifecycle = Lifecycle::Stopped;
        info!(
            "session stopped: {} cpm, {}% accuracy, completed={}",
            result.speed_cpm, result.accuracy_pct, result.completed
        );
        self.notify(&SessionEvent::Stopped(Box::new(result.clone())));
        self.result = Some(result);
    }

    fn notify(&mut self, event: &SessionEvent) {
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::drill::from_resolved;
    use crate::error::DrillError;
    use assert_matches::assert_matches;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn two_items() -> Vec<DrillItem> {
        from_resolved([('把', "b", "a"), ('我', "w", "o")])
    }

    fn session_at(start_ms: u64) -> (Session<ManualClock>, ManualClock) {
        let clock = ManualClock::new(start_ms);
        (Session::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_start_rejects_empty_text() {
        let (mut session, _) = session_at(0);

        assert_matches!(session.start(vec![]), Err(DrillError::InvalidInput { .. }));
        assert_eq!(session.lifecycle(), Lifecycle::Idle);
    }

    #[test]
    fn test_start_twice_fails() {
        let (mut session, _) = session_at(0);
        session.start(two_items()).unwrap();

        assert_matches!(
            session.start(two_items()),
            Err(DrillError::InvalidState { operation, .. }) if operation == "start"
        );
    }

    #[test]
    fn test_keystroke_before_start_is_ignored() {
        let (mut session, _) = session_at(0);

        assert_eq!(
            session.press("b"),
            KeystrokeResult::Ignored(IgnoreReason::NotActive)
        );
        assert!(session.state().is_none());
        assert_eq!(session.lifecycle(), Lifecycle::Idle);
    }

    #[test]
    fn test_keystroke_while_paused_is_ignored() {
        let (mut session, _) = session_at(0);
        session.start(two_items()).unwrap();
        session.pause().unwrap();

        assert_eq!(
            session.press("b"),
            KeystrokeResult::Ignored(IgnoreReason::NotActive)
        );
        let state = session.state().unwrap();
        assert_eq!(state.keystrokes().len(), 0);
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn test_pause_and_resume_transitions() {
        let (mut session, _) = session_at(0);

        assert_matches!(session.pause(), Err(DrillError::InvalidState { .. }));
        session.start(two_items()).unwrap();
        assert_matches!(session.resume(), Err(DrillError::InvalidState { .. }));

        session.pause().unwrap();
        assert_matches!(session.pause(), Err(DrillError::InvalidState { .. }));
        assert_eq!(session.lifecycle(), Lifecycle::Paused);

        session.toggle_pause().unwrap();
        assert_eq!(session.lifecycle(), Lifecycle::Active);
    }

    #[test]
    fn test_paused_time_is_excluded() {
        let (mut session, clock) = session_at(10_000);
        session.start(two_items()).unwrap();

        clock.advance(1_000);
        session.press("b");
        session.press("a");
        session.pause().unwrap();
        clock.advance(60_000);
        assert_eq!(session.live_stats().unwrap().elapsed_ms, 1_000);
        session.resume().unwrap();
        clock.advance(1_000);
        session.press("w");
        session.press("o");

        let result = session.result().unwrap();
        assert!(result.completed);
        assert_eq!(result.duration_ms, 2_000);
        assert_eq!(result.speed_cpm, 60);
        assert_eq!(session.lifecycle(), Lifecycle::Stopped);
    }

    #[test]
    fn test_stop_while_paused_excludes_open_pause() {
        let (mut session, clock) = session_at(0);
        session.start(two_items()).unwrap();
        clock.advance(3_000);
        session.pause().unwrap();
        clock.advance(5_000);

        let result = session.stop().unwrap();
        assert_eq!(result.duration_ms, 3_000);
        assert!(!result.completed);
    }

    #[test]
    fn test_second_stop_fails_and_keeps_result() {
        let (mut session, clock) = session_at(0);
        session.start(two_items()).unwrap();
        clock.advance(2_000);
        session.press("b");
        session.press("a");

        let first = session.stop().unwrap();
        clock.advance(5_000);

        assert_matches!(
            session.stop(),
            Err(DrillError::InvalidState { operation, state }) if operation == "stop" && state == "stopped"
        );
        assert_eq!(session.result(), Some(&first));
        assert_eq!(first.correct_characters, 1);
    }

    #[test]
    fn test_completion_stops_session() {
        let (mut session, _) = session_at(0);
        session.start(from_resolved([('把', "b", "a")])).unwrap();
        session.handle_keystroke("b", 100);
        let result = session.handle_keystroke("a", 200);

        assert_matches!(result, KeystrokeResult::Processed(outcome) if outcome.session_completed);
        assert_eq!(session.lifecycle(), Lifecycle::Stopped);
        assert_eq!(session.result().unwrap().duration_ms, 200);
        assert_matches!(session.stop(), Err(DrillError::InvalidState { .. }));
        assert_eq!(
            session.handle_keystroke("b", 300),
            KeystrokeResult::Ignored(IgnoreReason::NotActive)
        );
    }

    #[test]
    fn test_completion_stops_exactly_once() {
        let (mut session, _) = session_at(0);
        let stopped = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&stopped);
        session.on_change(move |event| {
            if let SessionEvent::Stopped(result) = event {
                sink.borrow_mut().push((**result).clone());
            }
        });

        session.start(from_resolved([('把', "b", "a")])).unwrap();
        session.handle_keystroke("b", 100);
        session.handle_keystroke("a", 400);
        assert_matches!(session.stop(), Err(DrillError::InvalidState { .. }));

        let stopped = stopped.borrow();
        assert_eq!(stopped.len(), 1);
        assert_eq!(session.result(), Some(&stopped[0]));
        assert_eq!(stopped[0].duration_ms, 400);
    }

    #[test]
    fn test_listeners_receive_events() {
        let (mut session, _) = session_at(0);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        session.on_change(move |event| sink.borrow_mut().push(event.clone()));

        session.start(from_resolved([('把', "b", "a")])).unwrap();
        session.pause().unwrap();
        session.resume().unwrap();
        session.handle_keystroke("b", 10);
        session.handle_keystroke("a", 20);

        let events = events.borrow();
        assert_eq!(events.len(), 6);
        assert_eq!(events[0], SessionEvent::Started { total_characters: 1 });
        assert_eq!(events[1], SessionEvent::Paused);
        assert_eq!(events[2], SessionEvent::Resumed);
        assert_matches!(&events[3], SessionEvent::Keystroke(o) if o.matched);
        assert_matches!(&events[5], SessionEvent::Stopped(result) if result.completed);
    }

    #[test]
    fn test_time_limit() {
        let clock = ManualClock::new(0);
        let mut session = Session::with_clock(clock.clone()).with_time_limit(Some(30_000));
        session.start(two_items()).unwrap();

        clock.advance(10_000);
        assert!(!session.time_limit_reached());
        assert_eq!(session.live_stats().unwrap().remaining_ms, Some(20_000));

        session.pause().unwrap();
        clock.advance(60_000);
        assert!(!session.time_limit_reached());
        session.resume().unwrap();

        clock.advance(20_000);
        assert!(session.time_limit_reached());
        assert_eq!(session.live_stats().unwrap().remaining_ms, Some(0));
    }

    #[test]
    fn test_no_time_limit_never_reached() {
        let (mut session, clock) = session_at(0);
        session.start(two_items()).unwrap();
        clock.advance(u32::MAX as u64);

        assert!(!session.time_limit_reached());
        assert_eq!(session.live_stats().unwrap().remaining_ms, None);
    }
}
