//! Maps terminal events onto a [`TypingSession`].
//!
//! The app owns the one-second cadence of [`TypingSession::tick`], snippet
//! rotation for continuous practice, score submission and replay playback.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::{Language, Mode, SessionConfig};
use crate::error::SessionError;
use crate::history::HistorySummary;
use crate::replay::{ReplayPlayer, SPEEDS};
use crate::score_log::ScoreSink;
use crate::session::{TickOutcome, TypingSession};
use crate::snippets::SnippetLibrary;
use crate::store::KeyValueStore;

pub const DURATIONS: [u32; 4] = [15, 30, 60, 120];

const FALLBACK_SNIPPET: &str = "fn main() {\n    println!(\"hello\");\n}";
const TICK_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Typing,
    Results,
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    Skipped,
    Saved,
    Failed(String),
}

pub struct App<S: KeyValueStore, C: Clock> {
    pub session: TypingSession<S, C>,
    pub screen: Screen,
    pub replay: Option<ReplayPlayer>,
    pub replay_speed: u32,
    pub snippets_completed: u32,
    pub submit_status: SubmitStatus,
    /// summary of the score log, refreshed whenever a run completes
    pub history: Option<HistorySummary>,
    snippets: SnippetLibrary,
    score_sink: Option<Box<dyn ScoreSink>>,
    last_tick_ms: i64,
    next_frame_ms: Option<i64>,
}

impl<S: KeyValueStore, C: Clock> App<S, C> {
    pub fn new(
        session: TypingSession<S, C>,
        snippets: SnippetLibrary,
        score_sink: Option<Box<dyn ScoreSink>>,
        replay_speed: u32,
    ) -> Self {
        let mut app = Self {
            session,
            screen: Screen::Typing,
            replay: None,
            replay_speed: replay_speed.max(1),
            snippets_completed: 0,
            submit_status: SubmitStatus::Skipped,
            history: None,
            snippets,
            score_sink,
            last_tick_ms: 0,
            next_frame_ms: None,
        };
        app.new_snippet();
        app
    }

    /// Reset the run and load a fresh snippet for the configured language.
    pub fn new_snippet(&mut self) {
        let snippet = self
            .snippets
            .random(self.session.config().language)
            .unwrap_or(FALLBACK_SNIPPET)
            .to_string();
        self.reset_session();
        self.session.assign_target(snippet);
        self.after_reset();
    }

    /// Reset the run, keeping the current snippet.
    pub fn restart(&mut self) {
        self.reset_session();
        self.after_reset();
    }

    fn reset_session(&mut self) {
        // a fresh app has no target yet
        if let Err(e) = self.session.reset() {
            debug!(error = %e, "reset ignored");
        }
    }

    fn after_reset(&mut self) {
        self.screen = Screen::Typing;
        self.replay = None;
        self.next_frame_ms = None;
        self.snippets_completed = 0;
        self.submit_status = SubmitStatus::Skipped;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppAction::Quit;
        }

        match self.screen {
            Screen::Typing => self.on_typing_key(key),
            Screen::Results => self.on_results_key(key),
            Screen::Replay => self.on_replay_key(key),
        }
    }

    fn on_typing_key(&mut self, key: KeyEvent) -> AppAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                if self.session.is_active() {
                    self.stop();
                } else {
                    return AppAction::Quit;
                }
            }
            KeyCode::Char('p') if ctrl => self.toggle_pause(),
            KeyCode::Char('r') if ctrl => self.restart(),
            KeyCode::Char('n') if ctrl => self.new_snippet(),
            KeyCode::Left => self.restart(),
            KeyCode::Right => self.new_snippet(),
            KeyCode::Backspace => {
                let mut input = self.session.user_input().to_string();
                if input.pop().is_some() {
                    self.push_input(input);
                }
            }
            KeyCode::Enter => {
                let mut input = self.session.user_input().to_string();
                input.push('\n');
                input.push_str(&self.indent_after(self.session.current_index()));
                self.push_input(input);
            }
            KeyCode::Tab => self.type_char('\t'),
            KeyCode::Char(c) if !ctrl => self.type_char(c),
            _ => {}
        }
        AppAction::Continue
    }

    fn on_results_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return AppAction::Quit,
            KeyCode::Char('r') | KeyCode::Left => self.restart(),
            KeyCode::Char('n') | KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Right => {
                self.new_snippet()
            }
            KeyCode::Char('p') => self.open_replay(),
            KeyCode::Char('l') => {
                let mut cfg = *self.session.config();
                cfg.language = next_in(&Language::ALL, cfg.language);
                self.reconfigure(cfg);
            }
            KeyCode::Char('m') => {
                let mut cfg = *self.session.config();
                cfg.mode = match cfg.mode {
                    Mode::Timed => Mode::Practice,
                    Mode::Practice => Mode::Timed,
                };
                self.reconfigure(cfg);
            }
            KeyCode::Char('d') => {
                let mut cfg = *self.session.config();
                cfg.duration = next_in(&DURATIONS, cfg.duration);
                self.reconfigure(cfg);
            }
            _ => {}
        }
        AppAction::Continue
    }

    fn on_replay_key(&mut self, key: KeyEvent) -> AppAction {
        let now = self.session.clock().now_ms();
        match key.code {
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('q') => {
                self.replay = None;
                self.next_frame_ms = None;
                self.screen = Screen::Results;
            }
            KeyCode::Char(' ') => {
                if let Some(player) = self.replay.as_mut() {
                    if player.is_playing() {
                        player.pause();
                        self.next_frame_ms = None;
                    } else {
                        player.play();
                        self.next_frame_ms =
                            player.next_delay().map(|d| now + d.as_millis() as i64);
                    }
                }
            }
            KeyCode::Char('r') => {
                if let Some(player) = self.replay.as_mut() {
                    player.reset();
                    self.next_frame_ms = None;
                }
            }
            KeyCode::Char(c) => {
                let speed = c.to_digit(10).filter(|s| SPEEDS.contains(s));
                if let (Some(speed), Some(player)) = (speed, self.replay.as_mut()) {
                    if player.set_speed(speed).is_ok() {
                        self.replay_speed = speed;
                    }
                }
            }
            _ => {}
        }
        AppAction::Continue
    }

    /// Drive time-based effects. Call on every loop wakeup.
    pub fn on_frame(&mut self) {
        let now = self.session.clock().now_ms();

        let running = self.session.is_active() && !self.session.is_paused();
        if running && now - self.last_tick_ms >= TICK_MS {
            self.last_tick_ms += TICK_MS;
            // a long stall should not replay every missed second
            if now - self.last_tick_ms >= TICK_MS {
                self.last_tick_ms = now;
            }
            match self.session.tick() {
                Ok(TickOutcome::Finished(_)) => self.on_complete(),
                Ok(TickOutcome::Running) => {}
                Err(e) => debug!(error = %e, "tick ignored"),
            }
        }

        if let (Some(player), Some(due)) = (self.replay.as_mut(), self.next_frame_ms) {
            if now >= due {
                player.advance();
                self.next_frame_ms = player.next_delay().map(|d| now + d.as_millis() as i64);
            }
        }
    }

    fn type_char(&mut self, c: char) {
        let mut input = self.session.user_input().to_string();
        input.push(c);
        self.push_input(input);
    }

    fn push_input(&mut self, input: String) {
        if self.session.is_complete() {
            return;
        }
        if !self.session.is_active() {
            if let Err(e) = self.session.start() {
                warn!(error = %e, "unable to start session");
                return;
            }
            self.last_tick_ms = self.session.clock().now_ms();
        }

        if let Err(e) = self.session.apply_input(&input) {
            debug!(error = %e, "input ignored");
            return;
        }

        let target_len = self.session.target_chars().len();
        if target_len > 0 && self.session.current_index() >= target_len {
            // continuous practice: next snippet, same counters and clock
            self.snippets_completed += 1;
            let next = self
                .snippets
                .random(self.session.config().language)
                .unwrap_or(FALLBACK_SNIPPET)
                .to_string();
            self.session.assign_target(next);
        }
    }

    /// Leading whitespace of the target line following the newline at `idx`
    fn indent_after(&self, idx: usize) -> String {
        if self.session.expected_char(idx) != Some('\n') {
            return String::new();
        }
        self.session.target_chars()[idx + 1..]
            .iter()
            .take_while(|c| **c == ' ' || **c == '\t')
            .collect()
    }

    fn toggle_pause(&mut self) {
        let result = if self.session.is_paused() {
            self.session.resume()
        } else {
            self.session.pause()
        };
        if let Err(e) = result {
            debug!(error = %e, "pause toggle ignored");
        }
        if self.session.is_active() && !self.session.is_paused() {
            // next countdown step is a full second after resuming
            self.last_tick_ms = self.session.clock().now_ms();
        }
    }

    fn stop(&mut self) {
        match self.session.finalize() {
            Ok(_) => self.on_complete(),
            Err(e) => warn!(error = %e, "unable to stop session"),
        }
    }

    fn on_complete(&mut self) {
        self.screen = Screen::Results;
        self.submit_status = match (self.session.submission(), self.score_sink.as_mut()) {
            (Some(score), Some(sink)) => match sink.submit(&score) {
                Ok(()) => SubmitStatus::Saved,
                Err(e) => {
                    warn!(error = %e, "score submission failed");
                    SubmitStatus::Failed(e.to_string())
                }
            },
            _ => SubmitStatus::Skipped,
        };
        self.refresh_history();
    }

    fn refresh_history(&mut self) {
        let Some(sink) = self.score_sink.as_ref() else {
            return;
        };
        match sink.history() {
            Ok(records) => self.history = Some(HistorySummary::from_records(&records)),
            Err(e) => warn!(error = %e, "unable to read score history"),
        }
    }

    fn open_replay(&mut self) {
        match ReplayPlayer::new(
            self.session.target(),
            self.session.replay_frames().to_vec(),
            self.replay_speed,
        ) {
            Ok(player) => {
                self.replay = Some(player);
                self.next_frame_ms = None;
                self.screen = Screen::Replay;
            }
            Err(e) => warn!(error = %e, "unable to open replay"),
        }
    }

    fn reconfigure(&mut self, cfg: SessionConfig) {
        match self.session.configure(cfg) {
            Ok(()) => self.new_snippet(),
            Err(SessionError::InvalidDuration) => warn!(?cfg, "rejected configuration"),
            Err(e) => debug!(error = %e, "configure ignored"),
        }
    }
}

fn next_in<T: Copy + PartialEq>(items: &[T], current: T) -> T {
    let idx = items.iter().position(|i| *i == current).unwrap_or(0);
    items[(idx + 1) % items.len()]
}
