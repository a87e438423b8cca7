pub mod ui;

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    cursor::Show,
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use directories::ProjectDirs;
use keypace::{
    catalog::Catalog,
    config::{Config, ConfigStore, FileConfigStore},
    controller::{ControllerSettings, SessionController},
    history::HistoryEntry,
    passage::{Category, Difficulty},
    quote::{HttpQuoteProvider, OfflineProvider, QuoteProvider},
    runtime::{
        AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, SystemClock, Ticker,
    },
    session::SessionError,
};
use log::{debug, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

const TICK_RATE_MS: u64 = 50;

/// typing speed test with curated passages and live wpm
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing speed test. Passages come from a built-in catalog graded by difficulty, or from an online quote service with a local fallback."
)]
pub struct Cli {
    /// difficulty tier for catalog passages
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// restrict catalog passages to one category
    #[clap(short = 'c', long, value_enum)]
    category: Option<Category>,

    /// number of seconds to run test
    #[clap(short = 's', long, value_parser = clap::value_parser!(u32).range(1..))]
    secs: Option<u32>,

    /// run until the passage is finished, with no countdown
    #[clap(long, conflicts_with = "secs")]
    no_timer: bool,

    /// never contact the quote service
    #[clap(long)]
    offline: bool,

    /// probability (0 to 1) of drawing from the catalog instead of fetching a quote
    #[clap(long)]
    catalog_share: Option<f64>,

    /// quote service endpoint
    #[clap(long)]
    quote_url: Option<String>,

    /// load passages from a JSON file instead of the built-in catalog
    #[clap(long)]
    catalog: Option<PathBuf>,
}

impl Cli {
    /// Overlay command line flags on the stored configuration
    fn apply(&self, cfg: &mut Config) {
        if let Some(difficulty) = self.difficulty {
            cfg.difficulty = difficulty;
        }
        if self.category.is_some() {
            cfg.category = self.category;
        }
        if self.secs.is_some() {
            cfg.time_limit_secs = self.secs;
        }
        if self.no_timer {
            cfg.time_limit_secs = None;
        }
        if self.offline {
            cfg.offline = true;
        }
        if let Some(share) = self.catalog_share {
            cfg.catalog_share = share;
        }
        if let Some(url) = &self.quote_url {
            cfg.quote_url = url.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub controller: SessionController,
    pub state: AppState,
    pub history: Vec<HistoryEntry>,
    pub difficulty_changed: bool,
}

impl App {
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller,
            state: AppState::Typing,
            history: vec![],
            difficulty_changed: false,
        }
    }

    pub fn on_tick(&mut self) {
        self.controller.on_tick();
        self.sync_state();
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind != KeyEventKind::Press {
            return Flow::Continue;
        }

        match key.code {
            KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Flow::Quit
            }
            KeyCode::Left => self.retry(),
            KeyCode::Right => self.next(),
            KeyCode::Backspace if self.state == AppState::Typing => {
                let outcome = self.controller.on_backspace();
                self.log_rejected(outcome);
            }
            KeyCode::Char(c) => match self.state {
                AppState::Typing => {
                    let outcome = self.controller.on_char(c);
                    self.log_rejected(outcome);
                }
                AppState::Results => self.on_results_key(c),
            },
            _ => {}
        }

        self.sync_state();
        Flow::Continue
    }

    fn on_results_key(&mut self, c: char) {
        match c {
            'r' => self.retry(),
            'n' => self.next(),
            '1'..='4' => {
                let idx = c as usize - '1' as usize;
                self.controller.set_difficulty(Difficulty::ALL[idx]);
                self.difficulty_changed = true;
                self.next();
            }
            _ => {}
        }
    }

    fn log_rejected<T>(&self, outcome: Result<T, SessionError>) {
        if let Err(e) = outcome {
            debug!("keystroke rejected: {e}");
        }
    }

    fn retry(&mut self) {
        self.controller.restart();
        self.state = AppState::Typing;
    }

    fn next(&mut self) {
        self.controller.reset();
        self.state = AppState::Typing;
    }

    /// Move to the results screen the first time a completed session is seen
    fn sync_state(&mut self) {
        if self.state == AppState::Results {
            return;
        }
        if let Some(result) = self.controller.result() {
            self.history
                .push(HistoryEntry::from_result(result, Local::now()));
            self.state = AppState::Results;
        }
    }
}

fn build_provider(cfg: &Config) -> Arc<dyn QuoteProvider> {
    if cfg.offline {
        return Arc::new(OfflineProvider);
    }
    match HttpQuoteProvider::new(cfg.quote_url.clone(), cfg.quote_timeout()) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            warn!("{e}; running offline");
            Arc::new(OfflineProvider)
        }
    }
}

/// Log to a file under the cache dir so output does not tear the terminal UI
fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(file) = open_log_file() {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
}

fn open_log_file() -> Option<File> {
    let dirs = ProjectDirs::from("", "", "keypace")?;
    fs::create_dir_all(dirs.cache_dir()).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dirs.cache_dir().join("keypace.log"))
        .ok()
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let mut cfg = store.load();
    cli.apply(&mut cfg);

    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin()?,
    };

    let controller = SessionController::new(
        Arc::new(catalog),
        build_provider(&cfg),
        SystemClock,
        ControllerSettings::from(&cfg),
    );
    let mut app = App::new(controller);

    enable_raw_mode()?;
    let outcome = start_tui(&mut app);
    let restored = restore_terminal();

    if app.difficulty_changed {
        let mut stored = store.load();
        stored.difficulty = app.controller.settings().difficulty;
        if let Err(e) = store.save(&stored) {
            warn!("unable to save config to {}: {e}", store.path().display());
        }
    }

    outcome?;
    restored
}

/// Runs with raw mode already on; the caller restores the terminal on every path
fn start_tui(app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    run_app(&mut terminal, app, &runner)
}

fn restore_terminal() -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, Show)?;
    Ok(())
}

/// Event loop. Session timers and fetches are released however it exits.
fn run_app<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    let outcome = event_loop(terminal, app, runner);
    app.controller.teardown();
    outcome
}

fn event_loop<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui(app, f))?;

        match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if app.on_key(key) == Flow::Quit {
                    return Ok(());
                }
            }
        }
    }
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use keypace::passage::Passage;
    use keypace::runtime::TestEventSource;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use ratatui::backend::{TestBackend, WindowSize};
    use ratatui::buffer::Cell;
    use ratatui::layout::{Position, Size};
    use std::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    pub(crate) fn test_app(text: &str, time_limit_secs: Option<u32>) -> App {
        let catalog = Catalog::from_passages(vec![Passage::new(
            text,
            "Test Source",
            Difficulty::Medium,
            Category::General,
            vec![],
        )
        .unwrap()])
        .unwrap();
        let settings = ControllerSettings {
            time_limit_secs,
            catalog_share: 1.0,
            ..ControllerSettings::default()
        };
        let controller = SessionController::with_rng(
            Arc::new(catalog),
            Arc::new(OfflineProvider),
            SystemClock,
            settings,
            StdRng::seed_from_u64(1),
        );
        App::new(controller)
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["keypace"]);

        assert_eq!(cli.difficulty, None);
        assert_eq!(cli.secs, None);
        assert!(!cli.no_timer);
        assert!(!cli.offline);
        assert!(cli.catalog.is_none());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "keypace",
            "-d",
            "expert",
            "--category",
            "science",
            "-s",
            "30",
            "--offline",
            "--catalog-share",
            "1",
            "--quote-url",
            "http://localhost/q",
        ]);
        let mut cfg = Config::default();
        cli.apply(&mut cfg);

        assert_eq!(cfg.difficulty, Difficulty::Expert);
        assert_eq!(cfg.category, Some(Category::Science));
        assert_eq!(cfg.time_limit_secs, Some(30));
        assert!(cfg.offline);
        assert_eq!(cfg.catalog_share, 1.0);
        assert_eq!(cfg.quote_url, "http://localhost/q");
    }

    #[test]
    fn test_cli_no_timer() {
        let cli = Cli::parse_from(["keypace", "--no-timer"]);
        let mut cfg = Config::default();
        cli.apply(&mut cfg);

        assert_eq!(cfg.time_limit_secs, None);
    }

    #[test]
    fn test_cli_rejects_zero_secs_and_conflicts() {
        assert!(Cli::try_parse_from(["keypace", "-s", "0"]).is_err());
        assert!(Cli::try_parse_from(["keypace", "-s", "10", "--no-timer"]).is_err());
    }

    #[test]
    fn test_cli_leaves_unset_fields() {
        let mut cfg = Config {
            difficulty: Difficulty::Hard,
            ..Config::default()
        };
        Cli::parse_from(["keypace"]).apply(&mut cfg);

        assert_eq!(cfg.difficulty, Difficulty::Hard);
        assert_eq!(cfg.time_limit_secs, Some(60));
    }

    #[test]
    fn test_build_provider_offline() {
        let cfg = Config {
            offline: true,
            ..Config::default()
        };
        assert!(build_provider(&cfg).fetch().is_err());
    }

    #[test]
    fn test_typing_to_the_end_shows_results() {
        let mut app = test_app("hi", None);

        app.on_key(key(KeyCode::Char('h')));
        assert_eq!(app.state, AppState::Typing);
        app.on_key(key(KeyCode::Char('i')));

        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.history.len(), 1);
        assert_eq!(app.history[0].accuracy, 100);
    }

    #[test]
    fn test_backspace_while_typing() {
        let mut app = test_app("hi", None);

        app.on_key(key(KeyCode::Char('x')));
        app.on_key(key(KeyCode::Backspace));

        let session = app.controller.session().unwrap();
        assert!(session.input().is_empty());
    }

    #[test]
    fn test_results_keys() {
        let mut app = test_app("hi", None);
        app.on_key(key(KeyCode::Char('h')));
        app.on_key(key(KeyCode::Char('i')));

        // typing keys do nothing on the results screen
        app.on_key(key(KeyCode::Char('x')));
        assert_eq!(app.state, AppState::Results);

        app.on_key(key(KeyCode::Char('r')));
        assert_eq!(app.state, AppState::Typing);
        assert!(app.controller.session().unwrap().input().is_empty());
        assert_eq!(app.history.len(), 1);
    }

    #[test]
    fn test_difficulty_selection_on_results() {
        let mut app = test_app("hi", None);
        app.on_key(key(KeyCode::Char('h')));
        app.on_key(key(KeyCode::Char('i')));

        app.on_key(key(KeyCode::Char('3')));

        assert_eq!(app.controller.settings().difficulty, Difficulty::Hard);
        assert!(app.difficulty_changed);
        assert_eq!(app.state, AppState::Typing);
        // single-passage catalog widens to any difficulty
        assert!(app.controller.session().is_some());
    }

    #[test]
    fn test_quit_keys() {
        let mut app = test_app("hi", None);

        assert_eq!(app.on_key(key(KeyCode::Esc)), Flow::Quit);
        assert_eq!(
            app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Flow::Quit
        );
        assert_eq!(app.on_key(key(KeyCode::Right)), Flow::Continue);
    }

    /// Backend whose writes always fail, as with a closed terminal
    struct BrokenBackend;

    impl Backend for BrokenBackend {
        fn draw<'a, I>(&mut self, _content: I) -> io::Result<()>
        where
            I: Iterator<Item = (u16, u16, &'a Cell)>,
        {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal gone"))
        }

        fn hide_cursor(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn show_cursor(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn get_cursor_position(&mut self) -> io::Result<Position> {
            Ok(Position::ORIGIN)
        }

        fn set_cursor_position<P: Into<Position>>(&mut self, _position: P) -> io::Result<()> {
            Ok(())
        }

        fn clear(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn size(&self) -> io::Result<Size> {
            Ok(Size::new(80, 24))
        }

        fn window_size(&mut self) -> io::Result<WindowSize> {
            Ok(WindowSize {
                columns_rows: Size::new(80, 24),
                pixels: Size::new(0, 0),
            })
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn test_runner() -> (mpsc::Sender<AppEvent>, Runner<TestEventSource, FixedTicker>) {
        let (tx, rx) = mpsc::channel();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(5)),
        );
        (tx, runner)
    }

    #[test]
    fn test_run_app_tears_down_on_quit() {
        let mut app = test_app("hello", Some(30));
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let (tx, runner) = test_runner();

        tx.send(AppEvent::Key(key(KeyCode::Char('h')))).unwrap();
        tx.send(AppEvent::Key(key(KeyCode::Esc))).unwrap();

        run_app(&mut terminal, &mut app, &runner).unwrap();

        assert!(!app.controller.is_scheduled());
        assert!(app.controller.session().is_none());
    }

    #[test]
    fn test_run_app_tears_down_when_draw_fails() {
        let mut app = test_app("hello", Some(30));
        app.on_key(key(KeyCode::Char('h')));
        assert!(app.controller.is_scheduled());

        let mut terminal = Terminal::new(BrokenBackend).unwrap();
        let (_tx, runner) = test_runner();

        assert!(run_app(&mut terminal, &mut app, &runner).is_err());
        assert!(!app.controller.is_scheduled());
        assert!(app.controller.session().is_none());
    }
}
