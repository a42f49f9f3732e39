//! The typing session state machine.
//!
//! ```text
//! idle --assign_target--> configured --start--> active --finalize/tick--> complete
//!                              ^                   |                         |
//!                              +------reset--------+-------------------------+
//! ```
//!
//! `paused` is a flag on `active`: it stops [`TypingSession::tick`] but input
//! is still accepted while paused.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{self, Mode, SessionConfig};
use crate::error::{Result, SessionError};
use crate::keyboard;
use crate::metrics;
use crate::progress::Progress;
use crate::score_log::ScoreSubmission;
use crate::store::{KeyValueStore, SqliteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    Idle,
    Configured,
    Active,
    Complete,
}

/// Snapshot of the input trace after one input event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayFrame {
    pub input: String,
    /// milliseconds since `start()`
    pub elapsed_ms: u64,
}

/// One point on the post-test performance graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WpmSample {
    pub second: u64,
    pub wpm: u32,
    pub raw: u32,
    /// cumulative incorrect characters at this second
    pub errors: u32,
}

impl From<WpmSample> for (f64, f64) {
    fn from(s: WpmSample) -> Self {
        (s.second as f64, s.wpm as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionResults {
    pub wpm: u32,
    pub accuracy: u32,
    pub is_new_personal_best: bool,
    pub daily_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    Finished(SessionResults),
}

/// All state for one practice or timed attempt, plus the progress carried
/// between attempts.
#[derive(Debug)]
pub struct TypingSession<S: KeyValueStore = SqliteStore, C: Clock = SystemClock> {
    config: SessionConfig,
    state: SessionState,
    paused: bool,

    target: String,
    target_chars: Vec<char>,
    input: String,
    current_index: usize,

    correct_chars: u32,
    incorrect_chars: u32,
    total_keystrokes: u32,
    key_errors: BTreeMap<char, u32>,

    replay_frames: Vec<ReplayFrame>,
    wpm_history: Vec<WpmSample>,

    live_wpm: u32,
    time_remaining: u32,
    started_at_ms: Option<i64>,
    results: Option<SessionResults>,

    progress: Progress,
    store: S,
    clock: C,
}

impl<S: KeyValueStore, C: Clock> TypingSession<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        let config = SessionConfig::default();
        Self {
            config,
            state: SessionState::Idle,
            paused: false,
            target: String::new(),
            target_chars: Vec::new(),
            input: String::new(),
            current_index: 0,
            correct_chars: 0,
            incorrect_chars: 0,
            total_keystrokes: 0,
            key_errors: BTreeMap::new(),
            replay_frames: Vec::new(),
            wpm_history: Vec::new(),
            live_wpm: 0,
            time_remaining: config.duration,
            started_at_ms: None,
            results: None,
            progress: Progress::default(),
            store,
            clock,
        }
    }

    /// Replace the configuration and persist it. Rejected while a run is active.
    pub fn configure(&mut self, config: SessionConfig) -> Result<()> {
        if self.state == SessionState::Active {
            return Err(self.invalid("configure"));
        }
        if config.duration == 0 {
            return Err(SessionError::InvalidDuration);
        }

        self.config = config;
        if self.state != SessionState::Complete {
            self.time_remaining = config.duration;
        }

        if let Err(e) = config::save_settings(&mut self.store, &config) {
            warn!(error = %e, "failed to persist settings");
        }
        Ok(())
    }

    /// Apply the settings found in the store, keeping defaults for anything missing.
    pub fn load_settings(&mut self) -> Result<()> {
        if self.state == SessionState::Active {
            return Err(self.invalid("load settings"));
        }
        let config = config::load_settings(&self.store)?;
        self.config = config;
        if self.state != SessionState::Complete {
            self.time_remaining = config.duration;
        }
        Ok(())
    }

    /// Read personal best and streak from the store, expiring a stale streak.
    pub fn load_persisted_progress(&mut self) -> Result<()> {
        self.progress = Progress::load(&mut self.store, self.clock.today())?;
        debug!(progress = ?self.progress, "loaded progress");
        Ok(())
    }

    /// Seed progress directly, bypassing the store.
    pub fn restore_progress(&mut self, progress: Progress) {
        self.progress = progress;
    }

    /// Replace the target text and clear the input trace.
    ///
    /// Counters, replay frames and history are left alone so that several
    /// snippets can be typed within one timed window; call [`Self::reset`]
    /// first for a clean slate.
    pub fn assign_target(&mut self, text: impl Into<String>) {
        self.target = text.into();
        self.target_chars = self.target.chars().collect();
        self.input.clear();
        self.current_index = 0;
        if self.state == SessionState::Idle {
            self.state = SessionState::Configured;
        }
    }

    /// Begin the run and start the speed clock.
    ///
    /// Only valid from `configured`: starting an active session again would
    /// move the start instant and corrupt elapsed-time math, so it is rejected.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            SessionState::Configured => {}
            SessionState::Idle => return Err(SessionError::NoTarget),
            _ => return Err(self.invalid("start")),
        }
        self.started_at_ms = Some(self.clock.now_ms());
        self.paused = false;
        self.live_wpm = 0;
        self.state = SessionState::Active;
        debug!(config = ?self.config, target_len = self.target_chars.len(), "session started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_active("pause")?;
        self.paused = true;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.ensure_active("resume")?;
        self.paused = false;
        Ok(())
    }

    /// Feed the full input trace after an input event.
    ///
    /// Growth is diffed character by character against the target; shrinking
    /// only moves the position. Every call records a replay frame. Input is
    /// accepted while paused.
    pub fn apply_input(&mut self, new_input: &str) -> Result<()> {
        self.ensure_active("apply input")?;

        let new_chars: Vec<char> = new_input.chars().collect();
        let old_len = self.current_index;

        if new_chars.len() > old_len {
            for (idx, &typed) in new_chars.iter().enumerate().skip(old_len) {
                let expected = self.target_chars.get(idx).copied();
                if expected == Some(typed) {
                    self.correct_chars += 1;
                } else {
                    self.incorrect_chars += 1;
                    // past the end of the target there is no key to blame
                    if let Some(expected) = expected {
                        *self.key_errors.entry(expected).or_insert(0) += 1;
                    }
                }
            }
            self.total_keystrokes += (new_chars.len() - old_len) as u32;
        }

        self.replay_frames.push(ReplayFrame {
            input: new_input.to_string(),
            elapsed_ms: self.elapsed_ms(),
        });
        self.input = new_input.to_string();
        self.current_index = new_chars.len();

        self.update_live_wpm();
        Ok(())
    }

    /// Called by the driver about once per second while active and not paused.
    ///
    /// Elapsed time comes from the clock, never from counting ticks.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.ensure_active("tick")?;
        if self.paused {
            return Err(SessionError::Paused);
        }

        let elapsed_secs = self.elapsed_ms() / 1000;
        if elapsed_secs > 0 && !self.wpm_history.iter().any(|s| s.second == elapsed_secs) {
            let secs = elapsed_secs as f64;
            self.wpm_history.push(WpmSample {
                second: elapsed_secs,
                wpm: metrics::capped(metrics::net_wpm(
                    self.correct_chars,
                    self.incorrect_chars,
                    secs,
                )),
                raw: metrics::capped(metrics::raw_wpm(self.total_keystrokes, secs)),
                errors: self.incorrect_chars,
            });
        }

        if self.config.mode == Mode::Timed {
            if self.time_remaining <= 1 {
                self.time_remaining = 0;
                return self.finalize().map(TickOutcome::Finished);
            }
            self.time_remaining -= 1;
        }

        self.update_live_wpm();
        Ok(TickOutcome::Running)
    }

    /// Compute the results and complete the session. Runs exactly once per run.
    pub fn finalize(&mut self) -> Result<SessionResults> {
        self.ensure_active("finalize")?;

        let elapsed_secs = match self.config.mode {
            Mode::Timed => self.config.duration.saturating_sub(self.time_remaining) as f64,
            Mode::Practice => self.elapsed_ms() as f64 / 1000.0,
        };

        let wpm = metrics::net_wpm(self.correct_chars, self.incorrect_chars, elapsed_secs);
        let accuracy = metrics::accuracy(self.correct_chars, self.total_keystrokes);

        let is_new_personal_best = self.progress.record_score(wpm, self.config.mode);
        if is_new_personal_best {
            info!(wpm, "new personal best");
            if let Err(e) = self.progress.save_personal_best(&mut self.store) {
                warn!(error = %e, "failed to persist personal best");
            }
        }

        if self.progress.record_practice(self.clock.today()) {
            info!(streak = self.progress.daily_streak, "daily streak updated");
            if let Err(e) = self.progress.save_streak(&mut self.store) {
                warn!(error = %e, "failed to persist streak");
            }
        }

        let results = SessionResults {
            wpm,
            accuracy,
            is_new_personal_best,
            daily_streak: self.progress.daily_streak,
        };
        self.results = Some(results);
        self.paused = false;
        self.state = SessionState::Complete;
        debug!(?results, elapsed_secs, "session complete");
        Ok(results)
    }

    /// Clear every per-run field and return to `configured`. Configuration,
    /// target text and progress are kept.
    pub fn reset(&mut self) -> Result<()> {
        if self.state == SessionState::Idle {
            return Err(SessionError::NoTarget);
        }
        self.paused = false;
        self.time_remaining = self.config.duration;
        self.input.clear();
        self.current_index = 0;
        self.correct_chars = 0;
        self.incorrect_chars = 0;
        self.total_keystrokes = 0;
        self.key_errors.clear();
        self.replay_frames.clear();
        self.wpm_history.clear();
        self.live_wpm = 0;
        self.started_at_ms = None;
        self.results = None;
        self.state = SessionState::Configured;
        debug!("session reset");
        Ok(())
    }

    fn update_live_wpm(&mut self) {
        if self.started_at_ms.is_none() {
            return;
        }
        let elapsed_ms = self.elapsed_ms();
        if elapsed_ms < metrics::LIVE_WPM_MIN_ELAPSED_MS {
            return;
        }
        self.live_wpm = metrics::capped(metrics::net_wpm(
            self.correct_chars,
            self.incorrect_chars,
            elapsed_ms as f64 / 1000.0,
        ));
    }

    fn ensure_active(&self, operation: &'static str) -> Result<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Complete => Err(SessionError::AlreadyComplete),
            _ => Err(self.invalid(operation)),
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            operation,
            state: self.state,
        }
    }

    /// Milliseconds since `start()`, or 0 before the session has started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at_ms
            .map(|start| (self.clock.now_ms() - start).max(0) as u64)
            .unwrap_or(0)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn target_chars(&self) -> &[char] {
        &self.target_chars
    }

    pub fn expected_char(&self, idx: usize) -> Option<char> {
        self.target_chars.get(idx).copied()
    }

    pub fn user_input(&self) -> &str {
        &self.input
    }

    /// Position in code points, equal to the length of the input trace.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn correct_chars(&self) -> u32 {
        self.correct_chars
    }

    pub fn incorrect_chars(&self) -> u32 {
        self.incorrect_chars
    }

    pub fn total_keystrokes(&self) -> u32 {
        self.total_keystrokes
    }

    pub fn key_errors(&self) -> &BTreeMap<char, u32> {
        &self.key_errors
    }

    pub fn most_missed_keys(&self, n: usize) -> Vec<(char, u32)> {
        keyboard::most_missed_keys(&self.key_errors, n)
    }

    pub fn replay_frames(&self) -> &[ReplayFrame] {
        &self.replay_frames
    }

    pub fn wpm_history(&self) -> &[WpmSample] {
        &self.wpm_history
    }

    /// Standard deviation of the sampled wpm, 0 without samples.
    pub fn consistency(&self) -> f64 {
        let samples: Vec<f64> = self.wpm_history.iter().map(|s| s.wpm as f64).collect();
        metrics::std_dev(&samples).unwrap_or(0.0)
    }

    pub fn live_wpm(&self) -> u32 {
        self.live_wpm
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn results(&self) -> Option<&SessionResults> {
        self.results.as_ref()
    }

    /// Score to hand to a [`crate::score_log::ScoreSink`]; only completed timed runs qualify.
    pub fn submission(&self) -> Option<ScoreSubmission> {
        match (self.results, self.config.mode) {
            (Some(results), Mode::Timed) => Some(ScoreSubmission {
                wpm: results.wpm,
                accuracy: results.accuracy,
                language: self.config.language,
                duration: self.config.duration,
            }),
            _ => None,
        }
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn personal_best(&self) -> u32 {
        self.progress.personal_best
    }

    pub fn daily_streak(&self) -> u32 {
        self.progress.daily_streak
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
