mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use setwise::{
    config::{Config, ConfigStore, FileConfigStore},
    finish_session, initialize, FinishOutcome,
    record::WorkoutRecord,
    runtime::{Input, SessionDriver, TerminalInput},
    session::{SessionEvent, SetValues, WorkoutSessionState},
    store::{SessionStore, SqliteSessionStore},
    template::{BundledTemplateProvider, DirTemplateProvider, LayeredTemplateProvider, TemplateProvider},
    util::format_clock,
    TemplateError,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::{Path, PathBuf},
    time::Duration,
};
use time_humanize::{Accuracy, HumanTime, Tense};

/// run workout templates set by set, with rest timers and session history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Run trainer-authored workout templates set by set in the terminal, with a workout clock, rest countdowns and a local session history."
)]
pub struct Cli {
    /// path to the config file
    #[clap(long)]
    config: Option<PathBuf>,

    /// path to the session database
    #[clap(long)]
    db: Option<PathBuf>,

    /// directory with additional templates (<id>.json)
    #[clap(long)]
    templates_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// run a workout session from a template
    Run {
        /// template id
        template: String,

        /// tick interval in milliseconds
        #[clap(long)]
        tick_ms: Option<u64>,
    },
    /// list available templates
    Templates,
    /// list recent sessions
    History {
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// export every recorded set as CSV
    Export { path: PathBuf },
}

impl Cli {
    fn load_config(&self) -> Config {
        let store = match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let mut config = store.load();
        if let Some(db) = &self.db {
            config.db_path = Some(db.clone());
        }
        if let Some(dir) = &self.templates_dir {
            config.templates_dir = Some(dir.clone());
        }
        if let Command::Run {
            tick_ms: Some(ms), ..
        } = self.command
        {
            config.tick_rate_ms = ms.max(10);
        }
        config
    }
}

fn template_provider(config: &Config) -> LayeredTemplateProvider {
    let provider = LayeredTemplateProvider::new();
    let provider = match config.templates_dir() {
        Some(dir) => provider.with(DirTemplateProvider::new(dir)),
        None => provider,
    };
    provider.with(BundledTemplateProvider)
}

fn open_store(config: &Config) -> Result<SqliteSessionStore, setwise::StoreError> {
    match config.db_path() {
        Some(path) => SqliteSessionStore::new(path),
        None => SqliteSessionStore::open_default(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Workout,
    ConfirmFinish,
    ConfirmAbandon,
    EditNotes,
    Summary,
}

#[derive(Debug)]
enum ExitType {
    Quit,
}

/// Outcome of handing the finished record to the store
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Saved(i64),
    Failed(String),
}

pub struct App {
    pub session: WorkoutSessionState,
    pub state: AppState,
    pub config: Config,
    pub store: Box<dyn SessionStore>,
    pub record: Option<WorkoutRecord>,
    pub save_status: Option<SaveStatus>,
    pub status: Option<String>,
    pub notes_input: String,
}

impl App {
    pub fn new(session: WorkoutSessionState, config: Config, store: Box<dyn SessionStore>) -> Self {
        Self {
            session,
            state: AppState::Workout,
            config,
            store,
            record: None,
            save_status: None,
            status: None,
            notes_input: String::new(),
        }
    }

    pub fn on_tick(&mut self, secs: u32) {
        if self.state == AppState::Summary || secs == 0 {
            return;
        }
        if let Err(e) = self.session.tick(secs) {
            self.status = Some(e.to_string());
        }
        self.drain_events();
    }

    fn drain_events(&mut self) {
        for event in self.session.take_events() {
            let message = match event {
                SessionEvent::RestFinished => Some("Rest over, next set".to_string()),
                SessionEvent::RestStarted { secs } => Some(format!("Resting {}", format_clock(secs.into()))),
                SessionEvent::ExerciseAdvanced { exercise } => self
                    .session
                    .exercises()
                    .get(exercise)
                    .map(|ex| format!("Up next: {}", ex.name)),
                SessionEvent::SessionCompleted => {
                    Some("All sets done, press f to finish".to_string())
                }
                SessionEvent::Paused => Some("Paused".to_string()),
                _ => None,
            };
            if message.is_some() {
                self.status = message;
            }
        }
    }

    fn adjust_current_set(&mut self, reps_delta: i64, weight_delta: f64) {
        let exercise = self.session.exercise_cursor();
        let set_index = self.session.current_exercise().current_set_index;
        let set = self.session.current_set();

        let values = SetValues {
            reps: (reps_delta != 0)
                .then(|| (set.reps.unwrap_or(0) as i64 + reps_delta).max(0) as u32),
            weight: (weight_delta != 0.0)
                .then(|| (set.weight.unwrap_or(0.0) + weight_delta).max(0.0)),
            ..Default::default()
        };
        if let Err(e) = self.session.update_set(exercise, set_index, values) {
            self.status = Some(e.to_string());
        }
    }

    fn complete_current_set(&mut self) {
        let exercise = self.session.exercise_cursor();
        let set_index = self.session.current_exercise().current_set_index;
        match self
            .session
            .complete_set(exercise, set_index, SetValues::default())
        {
            Ok(()) => self.status = None,
            Err(e) => self.status = Some(e.to_string()),
        }
        self.drain_events();
    }

    fn navigate(&mut self, exercise: usize) {
        if let Err(e) = self.session.navigate_to(exercise) {
            self.status = Some(e.to_string());
        }
    }

    fn finish(&mut self) {
        match finish_session(&mut self.session, "", self.store.as_mut()) {
            Ok(FinishOutcome::Saved { id, record }) => {
                self.record = Some(record);
                self.save_status = Some(SaveStatus::Saved(id));
            }
            Ok(FinishOutcome::NotSaved { record, error }) => {
                self.record = Some(record);
                self.save_status = Some(SaveStatus::Failed(error.to_string()));
            }
            Err(e) => {
                self.status = Some(e.to_string());
                self.state = AppState::Workout;
                return;
            }
        }
        self.state = AppState::Summary;
    }

    fn retry_save(&mut self) {
        if let (Some(record), Some(SaveStatus::Failed(_))) = (&self.record, &self.save_status) {
            self.save_status = Some(match self.store.persist(record) {
                Ok(id) => SaveStatus::Saved(id),
                Err(e) => SaveStatus::Failed(e.to_string()),
            });
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Option<ExitType> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(ExitType::Quit);
        }

        match self.state {
            AppState::Workout => match key.code {
                KeyCode::Esc => {
                    if self.session.is_started() {
                        self.state = AppState::ConfirmAbandon;
                    } else {
                        return Some(ExitType::Quit);
                    }
                }
                KeyCode::Char(' ') => {
                    let result = if self.session.is_started() {
                        self.session.toggle_pause()
                    } else {
                        self.session.start()
                    };
                    if let Err(e) = result {
                        self.status = Some(e.to_string());
                    }
                    self.drain_events();
                }
                KeyCode::Enter => self.complete_current_set(),
                KeyCode::Char('s') => {
                    if let Err(e) = self.session.skip_rest() {
                        self.status = Some(e.to_string());
                    }
                    self.drain_events();
                }
                KeyCode::Left => {
                    let cursor = self.session.exercise_cursor();
                    if cursor > 0 {
                        self.navigate(cursor - 1);
                    }
                }
                KeyCode::Right => {
                    let next = self.session.exercise_cursor() + 1;
                    if next < self.session.exercises().len() {
                        self.navigate(next);
                    }
                }
                KeyCode::Char('n') => {
                    self.notes_input = self.session.notes().to_string();
                    self.state = AppState::EditNotes;
                }
                KeyCode::Up => self.adjust_current_set(1, 0.0),
                KeyCode::Down => self.adjust_current_set(-1, 0.0),
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    self.adjust_current_set(0, self.config.weight_step)
                }
                KeyCode::Char('-') => self.adjust_current_set(0, -self.config.weight_step),
                KeyCode::Char('f') => {
                    if !self.session.is_started() {
                        self.status = Some("Nothing to finish yet".to_string());
                    } else if self.session.is_completed() {
                        self.finish();
                    } else {
                        self.state = AppState::ConfirmFinish;
                    }
                }
                _ => {}
            },
            AppState::ConfirmFinish => match key.code {
                KeyCode::Char('y') => self.finish(),
                KeyCode::Char('n') | KeyCode::Esc => self.state = AppState::Workout,
                _ => {}
            },
            AppState::ConfirmAbandon => match key.code {
                KeyCode::Char('y') => return Some(ExitType::Quit),
                KeyCode::Char('n') | KeyCode::Esc => self.state = AppState::Workout,
                _ => {}
            },
            AppState::EditNotes => match key.code {
                KeyCode::Enter => {
                    if let Err(e) = self.session.set_notes(self.notes_input.trim()) {
                        self.status = Some(e.to_string());
                    }
                    self.state = AppState::Workout;
                }
                KeyCode::Esc => self.state = AppState::Workout,
                KeyCode::Backspace => {
                    self.notes_input.pop();
                }
                KeyCode::Char(c) => self.notes_input.push(c),
                _ => {}
            },
            AppState::Summary => match key.code {
                KeyCode::Char('r') => self.retry_save(),
                KeyCode::Esc | KeyCode::Char('q') => return Some(ExitType::Quit),
                _ => {}
            },
        }
        None
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = cli.load_config();

    match &cli.command {
        Command::Run { template, .. } => run_session(&config, template),
        Command::Templates => list_templates(&config),
        Command::History { limit } => show_history(&config, *limit),
        Command::Export { path } => export_history(&config, path),
    }
}

fn list_templates(config: &Config) -> Result<(), Box<dyn Error>> {
    for t in template_provider(config).list_templates()? {
        println!(
            "{:<16} {:<24} {} exercises, {} sets",
            t.id,
            t.name,
            t.exercises.len(),
            t.total_sets()
        );
    }
    Ok(())
}

fn show_history(config: &Config, limit: usize) -> Result<(), Box<dyn Error>> {
    let store = open_store(config)?;
    let sessions = store.recent_sessions(limit)?;
    if sessions.is_empty() {
        println!("no sessions recorded yet");
        return Ok(());
    }

    let now = chrono::Local::now();
    for s in &sessions {
        let ago = (now - s.started_at).to_std().unwrap_or_default();
        println!(
            "#{:<4} {:<18} {:<24} {:>8}  {}/{} sets  {:.0} {}  {}",
            s.id,
            HumanTime::from(ago).to_text_en(Accuracy::Rough, Tense::Past),
            s.template_name,
            format_clock(s.elapsed_secs),
            s.completed_sets,
            s.total_sets,
            s.total_volume,
            config.weight_unit,
            if s.completed { "done" } else { "partial" }
        );
    }

    let totals = store.totals()?;
    println!(
        "{} sessions, {} sets, {:.0} {} lifted, avg {}",
        totals.total_sessions,
        totals.total_sets,
        totals.total_volume,
        config.weight_unit,
        format_clock(totals.avg_elapsed_secs.round() as u64)
    );
    Ok(())
}

fn export_history(config: &Config, path: &Path) -> Result<(), Box<dyn Error>> {
    let store = open_store(config)?;
    let rows = store.export_csv(File::create(path)?)?;
    println!("wrote {rows} sets to {}", path.display());
    Ok(())
}

fn run_session(config: &Config, template_id: &str) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let template = match template_provider(config).fetch_template(template_id) {
        Ok(t) => t,
        Err(TemplateError::NotFound(id)) => {
            let mut cmd = Cli::command();
            cmd.error(
                ErrorKind::InvalidValue,
                format!("no template named '{id}' (see `setwise templates`)"),
            )
            .exit();
        }
        Err(e) => return Err(e.into()),
    };
    let session = initialize(&template)?;
    let store = open_store(config)?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session, config.clone(), Box::new(store));
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if app.record.is_none() && app.session.is_started() {
        log::info!("session {} abandoned", app.session.template_id());
    }
    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut driver = SessionDriver::new(
        TerminalInput::spawn(),
        Duration::from_millis(app.config.tick_rate_ms),
    );

    loop {
        terminal.draw(|f| ui(app, f))?;

        let step = driver.step();
        app.on_tick(step.elapsed_secs);

        if let Some(Input::Key(key)) = step.input {
            if let Some(ExitType::Quit) = app.on_key(key) {
                break;
            }
        }
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    ui::screen::current_screen(&app.state).render(app, f);
}
