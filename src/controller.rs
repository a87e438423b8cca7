//! Session lifecycle: passage selection, input routing and timers.
//!
//! The controller is the single owner of the current [`TypingSession`]. Timers
//! are polled from [`SessionController::on_tick`] instead of firing callbacks,
//! so every handler reads the live session and none can outlive it.

use crate::catalog::Catalog;
use crate::passage::{Category, Difficulty, Passage};
use crate::quote::QuoteProvider;
use crate::runtime::{Clock, Schedule, ScheduledEvent, SystemClock};
use crate::session::{SessionError, SessionResult, SessionSnapshot, SessionStatus, TypingSession};
use crate::source::{
    CatalogSource, PassageSource, QuoteSource, SourceKind, SourceMix, DEFAULT_CATALOG_SHARE,
};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub difficulty: Difficulty,
    pub category: Option<Category>,
    pub time_limit_secs: Option<u32>,
    pub catalog_share: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            category: None,
            time_limit_secs: Some(60),
            catalog_share: DEFAULT_CATALOG_SHARE,
        }
    }
}

/// An in-flight quote request. Dropping it abandons the result.
struct PendingQuote {
    generation: u64,
    rx: Receiver<(u64, Passage)>,
}

pub struct SessionController<C: Clock = SystemClock> {
    catalog: Arc<Catalog>,
    provider: Arc<dyn QuoteProvider>,
    clock: C,
    settings: ControllerSettings,
    session: Option<TypingSession>,
    schedule: Schedule,
    generation: u64,
    pending: Option<PendingQuote>,
    rng: StdRng,
}

impl<C: Clock> SessionController<C> {
    pub fn new(
        catalog: Arc<Catalog>,
        provider: Arc<dyn QuoteProvider>,
        clock: C,
        settings: ControllerSettings,
    ) -> Self {
        Self::with_rng(catalog, provider, clock, settings, StdRng::from_entropy())
    }

    /// Construct with a caller-provided RNG, for reproducible passage picks
    pub fn with_rng(
        catalog: Arc<Catalog>,
        provider: Arc<dyn QuoteProvider>,
        clock: C,
        settings: ControllerSettings,
        rng: StdRng,
    ) -> Self {
        let mut controller = Self {
            catalog,
            provider,
            clock,
            settings,
            session: None,
            schedule: Schedule::default(),
            generation: 0,
            pending: None,
            rng,
        };
        controller.reset();
        controller
    }

    /// Discard the current session and bind a new one to a fresh passage.
    /// Quote passages arrive asynchronously; see [`Self::poll_pending`].
    pub fn reset(&mut self) {
        self.discard_session();

        match SourceMix::new(self.settings.catalog_share).choose(&mut self.rng) {
            SourceKind::Catalog => {
                let passage = self.catalog_source().next_passage(&mut self.rng);
                self.install(passage);
            }
            SourceKind::Quote => self.request_quote(),
        }
    }

    /// Retry the same passage with a fresh session. No-op while a passage is
    /// still being fetched.
    pub fn restart(&mut self) -> bool {
        let Some(passage) = self.session.as_ref().map(|s| s.passage().clone()) else {
            return false;
        };
        self.discard_session();
        self.install(passage);
        true
    }

    /// Stop timers and abandon any in-flight fetch
    pub fn teardown(&mut self) {
        self.discard_session();
    }

    fn discard_session(&mut self) {
        self.schedule.stop();
        self.generation += 1;
        self.pending = None;
        self.session = None;
    }

    fn catalog_source(&self) -> CatalogSource {
        CatalogSource::new(
            self.catalog.clone(),
            self.settings.difficulty,
            self.settings.category,
        )
    }

    fn request_quote(&mut self) {
        let (tx, rx) = mpsc::channel();
        let generation = self.generation;
        let source = QuoteSource::new(self.provider.clone(), self.catalog.clone());
        let mut rng = StdRng::seed_from_u64(self.rng.gen());

        std::thread::spawn(move || {
            let passage = source.next_passage(&mut rng);
            // receiver is gone after a reset
            let _ = tx.send((generation, passage));
        });

        debug!("requested quote (generation {generation})");
        self.pending = Some(PendingQuote { generation, rx });
    }

    fn install(&mut self, passage: Passage) {
        debug!(
            "new passage: {} / {} from {}",
            passage.difficulty(),
            passage.category(),
            passage.source()
        );
        self.session = Some(TypingSession::new(passage, self.settings.time_limit_secs));
    }

    /// Install a fetched quote if one has arrived for the current generation.
    /// Returns true when a passage was installed.
    pub fn poll_pending(&mut self) -> bool {
        let Some(pending) = self.pending.as_ref() else {
            return false;
        };

        match pending.rx.try_recv() {
            Ok((generation, passage)) if generation == self.generation => {
                self.pending = None;
                self.install(passage);
                true
            }
            Ok((generation, _)) => {
                debug!("discarding stale quote (generation {generation})");
                false
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                warn!("quote worker exited without a passage; using catalog");
                self.pending = None;
                let passage = self.catalog_source().next_passage(&mut self.rng);
                self.install(passage);
                true
            }
        }
    }

    pub fn is_awaiting_passage(&self) -> bool {
        self.session.is_none()
    }

    /// Replace the whole input. Ignored while no passage is bound.
    pub fn on_input(&mut self, input: &str) -> Result<SessionStatus, SessionError> {
        self.apply(|session, now| session.set_input(input, now))
    }

    pub fn on_char(&mut self, c: char) -> Result<SessionStatus, SessionError> {
        self.apply(|session, now| session.type_char(c, now))
    }

    pub fn on_backspace(&mut self) -> Result<SessionStatus, SessionError> {
        self.apply(|session, now| session.backspace(now))
    }

    fn apply<F>(&mut self, update: F) -> Result<SessionStatus, SessionError>
    where
        F: FnOnce(&mut TypingSession, Instant) -> Result<SessionStatus, SessionError>,
    {
        let now = self.clock.now();
        // deadlines that passed since the last tick land before this keystroke
        self.run_due(now);
        let Some(session) = self.session.as_mut() else {
            debug!("input ignored while awaiting passage");
            return Ok(SessionStatus::Pending);
        };

        let was_pending = session.status() == SessionStatus::Pending;
        let status = update(session, now)?;

        match status {
            SessionStatus::Running if was_pending => self.arm_schedule(now),
            SessionStatus::Complete => self.schedule.stop(),
            _ => {}
        }
        Ok(status)
    }

    /// Start the countdown before the first keystroke
    pub fn start_countdown(&mut self) -> bool {
        let now = self.clock.now();
        let started = self
            .session
            .as_mut()
            .map(|session| session.start(now))
            .unwrap_or(false);
        if started {
            self.arm_schedule(now);
        }
        started
    }

    fn arm_schedule(&mut self, now: Instant) {
        let with_countdown = self.settings.time_limit_secs.is_some();
        self.schedule.start(now, with_countdown);
    }

    /// Drive pending fetches and any due timers
    pub fn on_tick(&mut self) -> Option<SessionStatus> {
        self.poll_pending();
        self.run_due(self.clock.now());
        self.session.as_ref().map(TypingSession::status)
    }

    fn run_due(&mut self, now: Instant) {
        while let Some(event) = self.schedule.poll(now) {
            let Some(session) = self.session.as_mut() else {
                self.schedule.stop();
                break;
            };

            match event {
                ScheduledEvent::Countdown(due) => {
                    if session.tick_countdown(due) == SessionStatus::Complete {
                        self.schedule.stop();
                    }
                }
                ScheduledEvent::Refresh(at) => session.refresh(at),
            }
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.schedule.is_active()
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let now = self.clock.now();
        self.session.as_ref().map(|s| s.snapshot(now))
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.session.as_ref().and_then(TypingSession::result)
    }

    pub fn session(&self) -> Option<&TypingSession> {
        self.session.as_ref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Takes effect on the next reset
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.settings.difficulty = difficulty;
    }

    /// Takes effect on the next reset
    pub fn set_catalog_share(&mut self, catalog_share: f64) {
        self.settings.catalog_share = catalog_share;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
