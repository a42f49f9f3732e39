pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod keyboard;
pub mod metrics;
pub mod progress;
pub mod replay;
pub mod runtime;
pub mod score_log;
pub mod session;
pub mod snippets;
pub mod store;
pub mod ui;

pub use app::App;
pub use error::{SessionError, StoreError};
pub use session::TypingSession;
