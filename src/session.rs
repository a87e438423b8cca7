use crate::metrics::{self, CharState, WpmSample};
use crate::passage::Passage;
use log::debug;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Running,
    Complete,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("input of {len} characters exceeds the {max} character passage")]
    InvalidInputLength { len: usize, max: usize },

    #[error("session is already complete")]
    Complete,
}

/// Frozen results of a finished session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionResult {
    pub wpm: u32,
    pub accuracy: u32,
    pub elapsed_secs: f64,
    pub characters_typed: usize,
    pub error_count: usize,
}

/// What the presentation layer needs on every tick or update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub elapsed_secs: f64,
    pub seconds_remaining: Option<u32>,
    pub wpm: u32,
    pub accuracy: u32,
    pub status: SessionStatus,
}

/// One typing test bound to a single passage
#[derive(Debug, Clone)]
pub struct TypingSession {
    passage: Passage,
    target: Vec<char>,
    input: Vec<char>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    time_limit_secs: Option<u32>,
    seconds_remaining: Option<u32>,
    error_count: usize,
    wpm: u32,
    accuracy: u32,
    wpm_samples: Vec<WpmSample>,
    status: SessionStatus,
    result: Option<SessionResult>,
}

impl TypingSession {
    pub fn new(passage: Passage, time_limit_secs: Option<u32>) -> Self {
        Self {
            target: passage.text().chars().collect(),
            passage,
            input: vec![],
            started_at: None,
            finished_at: None,
            time_limit_secs,
            seconds_remaining: time_limit_secs,
            error_count: 0,
            wpm: 0,
            accuracy: 100,
            wpm_samples: vec![],
            status: SessionStatus::Pending,
            result: None,
        }
    }

    /// Pending -> running. Returns false if the session had already started.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.status != SessionStatus::Pending {
            return false;
        }
        self.started_at = Some(now);
        self.status = SessionStatus::Running;
        debug!("session started ({} chars)", self.target.len());
        true
    }

    /// Replace the whole input, as a text field would report it.
    ///
    /// Input longer than the passage, or any input after completion, is
    /// rejected and leaves the session untouched.
    pub fn set_input(&mut self, input: &str, now: Instant) -> Result<SessionStatus, SessionError> {
        let chars = input.chars().collect::<Vec<_>>();
        self.apply_input(chars, now)
    }

    pub fn type_char(&mut self, c: char, now: Instant) -> Result<SessionStatus, SessionError> {
        let mut chars = self.input.clone();
        chars.push(c);
        self.apply_input(chars, now)
    }

    pub fn backspace(&mut self, now: Instant) -> Result<SessionStatus, SessionError> {
        let mut chars = self.input.clone();
        chars.pop();
        self.apply_input(chars, now)
    }

    fn apply_input(&mut self, chars: Vec<char>, now: Instant) -> Result<SessionStatus, SessionError> {
        if self.status == SessionStatus::Complete {
            return Err(SessionError::Complete);
        }
        if chars.len() > self.target.len() {
            return Err(SessionError::InvalidInputLength {
                len: chars.len(),
                max: self.target.len(),
            });
        }

        if self.status == SessionStatus::Pending && !chars.is_empty() {
            self.start(now);
        }

        self.input = chars;
        self.recompute(now);

        if self.input.len() == self.target.len() {
            self.complete(now);
        }
        Ok(self.status)
    }

    /// Recount errors from scratch and derive live metrics
    fn recompute(&mut self, now: Instant) {
        self.error_count = metrics::error_count(&self.target, &self.input);
        self.accuracy = metrics::accuracy(self.input.len(), self.error_count);
        self.wpm = metrics::wpm(self.elapsed_secs(now), self.correct_chars());
    }

    /// Periodic metrics refresh while running; also records a WPM sample
    pub fn refresh(&mut self, now: Instant) {
        if self.status != SessionStatus::Running {
            return;
        }
        self.recompute(now);
        self.wpm_samples
            .push(WpmSample::new(self.elapsed_secs(now), self.wpm as f64));
    }

    /// One countdown second. Completes the session when the countdown hits zero.
    pub fn tick_countdown(&mut self, now: Instant) -> SessionStatus {
        if self.status != SessionStatus::Running {
            return self.status;
        }
        if let Some(remaining) = self.seconds_remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                self.complete(now);
            }
        }
        self.status
    }

    /// Freeze the results. Fires at most once; later calls return false and
    /// leave the frozen result alone.
    pub fn complete(&mut self, now: Instant) -> bool {
        if self.status == SessionStatus::Complete {
            return false;
        }

        self.recompute(now);
        self.finished_at = Some(now);
        self.status = SessionStatus::Complete;

        let result = SessionResult {
            wpm: self.wpm,
            accuracy: self.accuracy,
            elapsed_secs: self.elapsed_secs(now),
            characters_typed: self.input.len(),
            error_count: self.error_count,
        };
        debug!(
            "session complete: {} wpm, {}% accuracy",
            result.wpm, result.accuracy
        );
        self.result = Some(result);
        true
    }

    /// Seconds since the first keystroke, frozen at completion
    pub fn elapsed_secs(&self, now: Instant) -> f64 {
        match self.started_at {
            Some(start) => {
                let end = self.finished_at.unwrap_or(now);
                end.saturating_duration_since(start).as_secs_f64()
            }
            None => 0.0,
        }
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            elapsed_secs: self.elapsed_secs(now),
            seconds_remaining: self.seconds_remaining,
            wpm: self.wpm,
            accuracy: self.accuracy,
            status: self.status,
        }
    }

    pub fn char_states(&self) -> Vec<CharState> {
        metrics::classify(&self.target, &self.input)
    }

    fn correct_chars(&self) -> usize {
        self.input.len().saturating_sub(self.error_count)
    }

    pub fn passage(&self) -> &Passage {
        &self.passage
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn input(&self) -> &[char] {
        &self.input
    }

    pub fn input_text(&self) -> String {
        self.input.iter().collect()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn has_started(&self) -> bool {
        self.status != SessionStatus::Pending
    }

    pub fn has_finished(&self) -> bool {
        self.status == SessionStatus::Complete
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    pub fn seconds_remaining(&self) -> Option<u32> {
        self.seconds_remaining
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    pub fn accuracy(&self) -> u32 {
        self.accuracy
    }

    pub fn wpm_samples(&self) -> &[WpmSample] {
        &self.wpm_samples
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passage::{Category, Difficulty};
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn session(text: &str, time_limit: Option<u32>) -> TypingSession {
        let passage =
            Passage::new(text, "Test", Difficulty::Easy, Category::General, vec![]).unwrap();
        TypingSession::new(passage, time_limit)
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_session_new() {
        let s = session("hello world", None);

        assert_eq!(s.status(), SessionStatus::Pending);
        assert_eq!(s.target().len(), 11);
        assert!(s.input().is_empty());
        assert_eq!(s.wpm(), 0);
        assert_eq!(s.accuracy(), 100);
        assert!(s.started_at().is_none());
        assert!(!s.has_started());
        assert!(!s.has_finished());
        assert!(s.result().is_none());
    }

    #[test]
    fn test_session_new_with_time_limit() {
        let s = session("test", Some(30));

        assert_eq!(s.time_limit_secs(), Some(30));
        assert_eq!(s.seconds_remaining(), Some(30));
    }

    #[test]
    fn test_first_keystroke_starts_session() {
        let mut s = session("test", None);
        let t0 = Instant::now();

        assert_eq!(s.type_char('t', t0), Ok(SessionStatus::Running));
        assert_eq!(s.started_at(), Some(t0));

        // started_at is set once only
        s.type_char('e', t0 + secs(1.0)).unwrap();
        assert_eq!(s.started_at(), Some(t0));
    }

    #[test]
    fn test_empty_input_does_not_start() {
        let mut s = session("test", None);

        assert_eq!(s.set_input("", Instant::now()), Ok(SessionStatus::Pending));
        assert!(s.started_at().is_none());
    }

    #[test]
    fn test_write_incorrect_char() {
        let mut s = session("test", None);
        let t0 = Instant::now();

        s.type_char('x', t0).unwrap();

        assert_eq!(s.error_count(), 1);
        assert_eq!(s.accuracy(), 0);
        assert_eq!(s.char_states()[0], CharState::Incorrect);
    }

    #[test]
    fn test_live_wpm_and_accuracy() {
        let mut s = session("the cat sat on the mat", None);
        let t0 = Instant::now();

        s.set_input("t", t0).unwrap();
        // 10 correct characters after 6 seconds: 2 words in 0.1 min
        s.set_input("the cat sa", t0 + secs(6.0)).unwrap();

        assert_eq!(s.error_count(), 0);
        assert_eq!(s.accuracy(), 100);
        assert_eq!(s.wpm(), 20);

        s.set_input("the cbt sx", t0 + secs(6.0)).unwrap();
        assert_eq!(s.error_count(), 2);
        assert_eq!(s.accuracy(), 80);
        assert_eq!(s.wpm(), 16);
    }

    #[test]
    fn test_wpm_is_zero_at_start_instant() {
        let mut s = session("test", None);
        let t0 = Instant::now();

        s.set_input("te", t0).unwrap();
        assert_eq!(s.wpm(), 0);
    }

    #[test]
    fn test_over_long_input_is_rejected() {
        let mut s = session("hi", None);
        let t0 = Instant::now();
        s.set_input("h", t0).unwrap();

        assert_matches!(
            s.set_input("hiya", t0 + secs(1.0)),
            Err(SessionError::InvalidInputLength { len: 4, max: 2 })
        );
        assert_eq!(s.input_text(), "h");
        assert_eq!(s.status(), SessionStatus::Running);
    }

    #[test]
    fn test_backspace_recomputes_errors() {
        let mut s = session("test", None);
        let t0 = Instant::now();

        s.type_char('t', t0).unwrap();
        s.type_char('x', t0).unwrap();
        assert_eq!(s.error_count(), 1);
        assert_eq!(s.accuracy(), 50);

        s.backspace(t0).unwrap();
        assert_eq!(s.error_count(), 0);
        assert_eq!(s.accuracy(), 100);

        s.type_char('e', t0).unwrap();
        assert_eq!(s.input_text(), "te");
        assert_eq!(s.error_count(), 0);
    }

    #[test]
    fn test_backspace_at_start() {
        let mut s = session("test", None);

        assert_eq!(s.backspace(Instant::now()), Ok(SessionStatus::Pending));
        assert!(s.input().is_empty());
    }

    #[test]
    fn test_completes_when_fully_typed() {
        let mut s = session("hi", None);
        let t0 = Instant::now();

        s.type_char('h', t0).unwrap();
        assert!(!s.has_finished());

        let status = s.type_char('i', t0 + secs(1.2)).unwrap();
        assert_eq!(status, SessionStatus::Complete);

        let result = s.result().unwrap();
        assert_eq!(result.accuracy, 100);
        assert_eq!(result.characters_typed, 2);
        assert_eq!(result.error_count, 0);
        assert_eq!(result.wpm, 20);
        assert!((result.elapsed_secs - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_fully_typed_with_errors_still_completes() {
        let mut s = session("test", None);
        let t0 = Instant::now();

        s.set_input("txst", t0).unwrap();

        assert!(s.has_finished());
        assert_eq!(s.result().unwrap().accuracy, 75);
    }

    #[test]
    fn test_input_after_completion_is_rejected() {
        let mut s = session("hi", None);
        let t0 = Instant::now();
        s.set_input("hi", t0).unwrap();

        assert_eq!(s.set_input("h", t0), Err(SessionError::Complete));
        assert_eq!(s.backspace(t0), Err(SessionError::Complete));
        assert_eq!(s.input_text(), "hi");
    }

    #[test]
    fn test_countdown_completes_session() {
        let mut s = session("a long passage", Some(2));
        let t0 = Instant::now();
        s.set_input("a lo", t0).unwrap();

        assert_eq!(s.tick_countdown(t0 + secs(1.0)), SessionStatus::Running);
        assert_eq!(s.seconds_remaining(), Some(1));
        assert_eq!(s.tick_countdown(t0 + secs(2.0)), SessionStatus::Complete);
        assert_eq!(s.seconds_remaining(), Some(0));

        let result = s.result().unwrap();
        assert_eq!(result.characters_typed, 4);
        assert_eq!(result.elapsed_secs, 2.0);
        // 4 correct chars over 2 seconds
        assert_eq!(result.wpm, 24);
    }

    #[test]
    fn test_countdown_ignored_while_pending() {
        let mut s = session("test", Some(1));

        assert_eq!(s.tick_countdown(Instant::now()), SessionStatus::Pending);
        assert_eq!(s.seconds_remaining(), Some(1));
    }

    #[test]
    fn test_completion_fires_once() {
        let mut s = session("hi", Some(5));
        let t0 = Instant::now();
        s.set_input("h", t0).unwrap();
        s.set_input("hi", t0 + secs(1.0)).unwrap();
        let frozen = *s.result().unwrap();

        // countdown reaching zero later must not change anything
        for i in 2..10 {
            assert_eq!(s.tick_countdown(t0 + secs(i as f64)), SessionStatus::Complete);
        }
        assert!(!s.complete(t0 + secs(30.0)));

        assert_eq!(s.result(), Some(&frozen));
        assert_eq!(s.elapsed_secs(t0 + secs(30.0)), frozen.elapsed_secs);
        assert_eq!(s.seconds_remaining(), Some(5));
    }

    #[test]
    fn test_explicit_start() {
        let mut s = session("test", Some(3));
        let t0 = Instant::now();

        assert!(s.start(t0));
        assert!(!s.start(t0 + secs(1.0)));
        assert_eq!(s.status(), SessionStatus::Running);
        assert_eq!(s.started_at(), Some(t0));
    }

    #[test]
    fn test_refresh_records_samples_while_running() {
        let mut s = session("hello world", None);
        let t0 = Instant::now();

        s.refresh(t0);
        assert!(s.wpm_samples().is_empty());

        s.set_input("hello", t0).unwrap();
        s.refresh(t0 + secs(3.0));
        s.refresh(t0 + secs(6.0));

        let samples = s.wpm_samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], WpmSample::new(3.0, 20.0));
        assert_eq!(samples[1], WpmSample::new(6.0, 10.0));
        assert_eq!(s.wpm(), 10);
    }

    #[test]
    fn test_snapshot() {
        let mut s = session("hello", Some(60));
        let t0 = Instant::now();
        s.set_input("hex", t0).unwrap();

        let snap = s.snapshot(t0 + secs(2.0));
        assert_eq!(snap.status, SessionStatus::Running);
        assert_eq!(snap.seconds_remaining, Some(60));
        assert_eq!(snap.accuracy, 67);
        assert_eq!(snap.elapsed_secs, 2.0);
    }

    #[test]
    fn test_complete_while_pending_freezes_zeroes() {
        let mut s = session("test", None);

        assert!(s.complete(Instant::now()));
        let result = s.result().unwrap();
        assert_eq!(result.wpm, 0);
        assert_eq!(result.accuracy, 100);
        assert_eq!(result.elapsed_secs, 0.0);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Running.to_string(), "running");
    }
}
