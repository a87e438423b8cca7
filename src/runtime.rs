use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Countdown granularity
pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);
/// Live metrics refresh period while a session is running
pub const REFRESH_PERIOD: Duration = Duration::from_millis(250);

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let event = match event::read() {
                Ok(CtEvent::Key(key)) => AppEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(event).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Event source fed from a channel, for tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time.
///
/// Ticks are due on a fixed cadence even while keys keep arriving, so a
/// held-down key cannot starve the timers.
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    last_tick: Cell<Instant>,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
            last_tick: Cell::new(Instant::now()),
        }
    }

    /// Returns the next event, or Tick once the tick interval has run out
    pub fn step(&self) -> AppEvent {
        let since_tick = self.last_tick.get().elapsed();
        let Some(wait) = self.ticker.interval().checked_sub(since_tick) else {
            return self.tick();
        };

        match self.event_source.recv_timeout(wait) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => self.tick(),
        }
    }

    fn tick(&self) -> AppEvent {
        self.last_tick.set(Instant::now());
        AppEvent::Tick
    }
}

/// Time source for the session controller
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// A repeating deadline, polled by the owner rather than firing callbacks
#[derive(Clone, Copy, Debug)]
pub struct Interval {
    period: Duration,
    next_due: Option<Instant>,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns the deadline that passed, advancing by one period. Call
    /// repeatedly to catch up on every missed period.
    pub fn poll(&mut self, now: Instant) -> Option<Instant> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        self.next_due = Some(due + self.period);
        Some(due)
    }

    /// Like `poll`, but folds all missed periods into a single firing
    pub fn poll_coalesced(&mut self, now: Instant) -> Option<Instant> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        let mut next = due + self.period;
        while next <= now {
            next += self.period;
        }
        self.next_due = Some(next);
        Some(due)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduledEvent {
    /// One countdown second elapsed at the given deadline
    Countdown(Instant),
    Refresh(Instant),
}

/// Countdown and refresh timers of one running session
#[derive(Clone, Copy, Debug)]
pub struct Schedule {
    countdown: Interval,
    refresh: Interval,
}

impl Schedule {
    pub fn new(countdown: Duration, refresh: Duration) -> Self {
        Self {
            countdown: Interval::new(countdown),
            refresh: Interval::new(refresh),
        }
    }

    /// Arm the refresh timer, and the countdown too when `with_countdown`
    pub fn start(&mut self, now: Instant, with_countdown: bool) {
        if with_countdown {
            self.countdown.start(now);
        }
        self.refresh.start(now);
    }

    pub fn stop(&mut self) {
        self.countdown.stop();
        self.refresh.stop();
    }

    pub fn is_active(&self) -> bool {
        self.countdown.is_active() || self.refresh.is_active()
    }

    /// Next due event; countdown ticks come first, one per missed second
    pub fn poll(&mut self, now: Instant) -> Option<ScheduledEvent> {
        if let Some(due) = self.countdown.poll(now) {
            return Some(ScheduledEvent::Countdown(due));
        }
        self.refresh
            .poll_coalesced(now)
            .map(|_| ScheduledEvent::Refresh(now))
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new(COUNTDOWN_PERIOD, REFRESH_PERIOD)
    }
}
