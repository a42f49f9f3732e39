use std::{
    error::Error,
    fs::{self, File},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use devtype::{
    app::{App, AppAction},
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{Language, Mode},
    runtime::{CrosstermEventSource, DriverEvent, Runner, FRAME_INTERVAL},
    score_log::{CsvScoreLog, ScoreSink},
    session::TypingSession,
    snippets::SnippetLibrary,
    store::SqliteStore,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

/// typing practice for programmers
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type real code snippets against the clock or at your own pace, with live wpm, per-key error heatmaps, replays, daily streaks and personal bests."
)]
pub struct Cli {
    /// number of seconds for a timed run (saved for next time)
    #[clap(short = 'd', long, value_parser = clap::value_parser!(u32).range(1..))]
    duration: Option<u32>,

    /// language to pull snippets from (saved for next time)
    #[clap(short = 'l', long, value_enum)]
    language: Option<Language>,

    /// timed runs count down, practice runs until you stop (saved for next time)
    #[clap(short = 'm', long, value_enum)]
    mode: Option<Mode>,

    /// initial replay speed multiplier
    #[clap(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    replay_speed: u32,

    /// path to the progress database
    #[clap(long)]
    db: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let db_path = cli
        .db
        .clone()
        .or_else(AppDirs::db_path)
        .ok_or("unable to resolve a state directory, pass --db")?;
    let store = SqliteStore::open(&db_path)?;

    let mut session = TypingSession::new(store, SystemClock);
    session.load_settings()?;
    session.load_persisted_progress()?;

    let mut config = *session.config();
    if let Some(duration) = cli.duration {
        config.duration = duration;
    }
    if let Some(language) = cli.language {
        config.language = language;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if config != *session.config() {
        session.configure(config)?;
    }
    info!(?config, db = %db_path.display(), "starting");

    let sink = AppDirs::score_log_path()
        .map(|p| Box::new(CsvScoreLog::new(p)) as Box<dyn ScoreSink>);
    let mut app = App::new(session, SnippetLibrary::embedded(), sink, cli.replay_speed);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

/// Log to a file; stdout belongs to the TUI. Logging is skipped when no
/// state directory can be resolved.
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = File::options().create(true).append(true).open(&path) else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App<SqliteStore, SystemClock>,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FRAME_INTERVAL);

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            DriverEvent::Key(key) => {
                if app.handle_key(key) == AppAction::Quit {
                    break;
                }
            }
            DriverEvent::Resize => {
                if let Err(e) = terminal.autoresize() {
                    warn!(error = %e, "resize failed");
                }
            }
            DriverEvent::Tick => {}
        }

        app.on_frame();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_leave_settings_alone() {
        let cli = Cli::try_parse_from(["devtype"]).unwrap();
        assert!(cli.duration.is_none());
        assert!(cli.language.is_none());
        assert!(cli.mode.is_none());
        assert_eq!(cli.replay_speed, 1);
    }

    #[test]
    fn cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "devtype", "-d", "60", "-l", "rust", "-m", "practice", "--replay-speed", "4",
        ])
        .unwrap();
        assert_eq!(cli.duration, Some(60));
        assert_eq!(cli.language, Some(Language::Rust));
        assert_eq!(cli.mode, Some(Mode::Practice));
        assert_eq!(cli.replay_speed, 4);
    }

    #[test]
    fn cli_rejects_zero_duration() {
        assert!(Cli::try_parse_from(["devtype", "--duration", "0"]).is_err());
        assert!(Cli::try_parse_from(["devtype", "--replay-speed", "0"]).is_err());
    }

    #[test]
    fn cli_rejects_unknown_language() {
        let err = Cli::try_parse_from(["devtype", "-l", "cobol"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
