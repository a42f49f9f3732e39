use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::store::{parse_value, KeyValueStore, DURATION_KEY, LANGUAGE_KEY, MODE_KEY};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// countdown from the configured duration
    Timed,
    /// open-ended, finishes when stopped
    Practice,
}

impl Mode {
    pub fn from_key(s: &str) -> Option<Self> {
        match s {
            "timed" => Some(Mode::Timed),
            "practice" => Some(Mode::Practice),
            _ => None,
        }
    }
}

/// Snippet categories
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    Typescript,
    Javascript,
    Python,
    Rust,
    Go,
    Java,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::Typescript,
        Language::Javascript,
        Language::Python,
        Language::Rust,
        Language::Go,
        Language::Java,
        Language::Cpp,
    ];

    pub fn from_key(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.to_string() == s)
    }
}

/// Settings fixed for the duration of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// seconds; only meaningful in timed mode
    pub duration: u32,
    pub language: Language,
    pub mode: Mode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration: 30,
            language: Language::Typescript,
            mode: Mode::Timed,
        }
    }
}

/// Read persisted settings on top of the defaults.
///
/// Each field is validated independently; unknown or malformed values are
/// skipped and the default is kept.
pub fn load_settings<S: KeyValueStore + ?Sized>(store: &S) -> Result<SessionConfig, StoreError> {
    let mut cfg = SessionConfig::default();

    if let Some(raw) = store.get(DURATION_KEY)? {
        match parse_duration(&raw) {
            Ok(duration) => cfg.duration = duration,
            Err(e) => warn!(error = %e, "ignoring stored duration"),
        }
    }

    if let Some(raw) = store.get(LANGUAGE_KEY)? {
        match Language::from_key(&raw).ok_or_else(|| StoreError::corrupt(LANGUAGE_KEY, &raw)) {
            Ok(language) => cfg.language = language,
            Err(e) => warn!(error = %e, "ignoring stored language"),
        }
    }

    if let Some(raw) = store.get(MODE_KEY)? {
        match Mode::from_key(&raw).ok_or_else(|| StoreError::corrupt(MODE_KEY, &raw)) {
            Ok(mode) => cfg.mode = mode,
            Err(e) => warn!(error = %e, "ignoring stored mode"),
        }
    }

    Ok(cfg)
}

/// A stored duration must be a positive number of seconds.
pub fn parse_duration(raw: &str) -> Result<u32, StoreError> {
    match parse_value::<u32>(DURATION_KEY, raw)? {
        0 => Err(StoreError::corrupt(DURATION_KEY, raw)),
        duration => Ok(duration),
    }
}

pub fn save_settings<S: KeyValueStore + ?Sized>(
    store: &mut S,
    cfg: &SessionConfig,
) -> Result<(), StoreError> {
    store.set(DURATION_KEY, &cfg.duration.to_string())?;
    store.set(LANGUAGE_KEY, &cfg.language.to_string())?;
    store.set(MODE_KEY, &cfg.mode.to_string())?;
    Ok(())
}
