//! Read-only playback of a recorded session.

use std::time::Duration;

use crate::error::ReplayError;
use crate::session::ReplayFrame;

/// Shortest pause between two frames, whatever the speed.
pub const MIN_FRAME_DELAY: Duration = Duration::from_millis(10);

/// Speeds offered by the replay screen
pub const SPEEDS: [u32; 3] = [1, 2, 4];

#[derive(Debug, Clone)]
pub struct ReplayPlayer {
    target: String,
    frames: Vec<ReplayFrame>,
    speed: u32,
    position: usize,
    display_input: String,
    playing: bool,
}

impl ReplayPlayer {
    pub fn new(
        target: impl Into<String>,
        frames: Vec<ReplayFrame>,
        speed: u32,
    ) -> Result<Self, ReplayError> {
        if speed == 0 {
            return Err(ReplayError::InvalidSpeed);
        }
        Ok(Self {
            target: target.into(),
            frames,
            speed,
            position: 0,
            display_input: String::new(),
            playing: false,
        })
    }

    pub fn set_speed(&mut self, speed: u32) -> Result<(), ReplayError> {
        if speed == 0 {
            return Err(ReplayError::InvalidSpeed);
        }
        self.speed = speed;
        Ok(())
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// Start playing; rewinds first if the last frame was already shown.
    pub fn play(&mut self) {
        if self.frames.is_empty() {
            return;
        }
        if self.position + 1 >= self.frames.len() {
            self.position = 0;
            self.display_input.clear();
        }
        self.playing = true;
        self.show_current();
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn reset(&mut self) {
        self.playing = false;
        self.position = 0;
        self.display_input.clear();
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Time to wait before [`Self::advance`], scaled by speed. `None` when
    /// stopped or on the last frame.
    pub fn next_delay(&self) -> Option<Duration> {
        if !self.playing {
            return None;
        }
        let current = self.frames.get(self.position)?;
        let next = self.frames.get(self.position + 1)?;
        let gap_ms = next.elapsed_ms.saturating_sub(current.elapsed_ms) / self.speed as u64;
        Some(Duration::from_millis(gap_ms).max(MIN_FRAME_DELAY))
    }

    /// Move to the next frame. Playback stops after the last one.
    pub fn advance(&mut self) {
        if !self.playing {
            return;
        }
        if self.position + 1 < self.frames.len() {
            self.position += 1;
            self.show_current();
        }
        if self.position + 1 >= self.frames.len() {
            self.playing = false;
        }
    }

    fn show_current(&mut self) {
        if let Some(frame) = self.frames.get(self.position) {
            self.display_input = frame.input.clone();
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn display_input(&self) -> &str {
        &self.display_input
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_elapsed_ms(&self) -> u64 {
        self.frames
            .get(self.position)
            .map(|f| f.elapsed_ms)
            .unwrap_or(0)
    }

    /// Gross speed of the displayed input at the current frame's timestamp
    pub fn current_wpm(&self) -> u32 {
        let elapsed_ms = self.current_elapsed_ms();
        if elapsed_ms == 0 {
            return 0;
        }
        let chars = self.display_input.chars().count() as f64;
        ((chars / 5.0) / (elapsed_ms as f64 / 60_000.0)).round() as u32
    }

    pub fn progress_percent(&self) -> u32 {
        let target_len = self.target.chars().count();
        if target_len == 0 {
            return 0;
        }
        let shown = self.display_input.chars().count() as f64;
        ((shown / target_len as f64) * 100.0).round() as u32
    }
}
