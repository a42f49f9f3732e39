use thiserror::Error;

use crate::session::SessionState;

/// Failures of the persistence collaborators (key-value store and score log)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("stored value for {key} is corrupt: {value:?}")]
    Corrupt { key: String, value: String },
}

impl StoreError {
    pub fn corrupt(key: &str, value: &str) -> Self {
        StoreError::Corrupt {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Contract violations reported by [`crate::session::TypingSession`]
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("cannot {operation} while session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },

    #[error("session is paused")]
    Paused,

    #[error("session is already complete")]
    AlreadyComplete,

    #[error("no target text assigned")]
    NoTarget,

    #[error("duration must be a positive number of seconds")]
    InvalidDuration,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplayError {
    #[error("playback speed must be at least 1x")]
    InvalidSpeed,
}

pub type Result<T> = std::result::Result<T, SessionError>;
