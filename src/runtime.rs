use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// How often the app loop wakes up without input, for redraws and replay frames
pub const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Unified event type consumed by the app loop
#[derive(Clone, Debug)]
pub enum DriverEvent {
    Key(KeyEvent),
    Resize,
    /// the frame interval passed without other events
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<DriverEvent, RecvTimeoutError>;
}

/// Production event source reading crossterm events on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<DriverEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // ignore key releases on terminals that report them
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(DriverEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(DriverEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
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
    fn recv_timeout(&self, timeout: Duration) -> Result<DriverEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed event source for headless drivers and tests
pub struct ChannelEventSource {
    rx: Receiver<DriverEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<DriverEvent>) -> Self {
        Self { rx }
    }

    pub fn pair() -> (Sender<DriverEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<DriverEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the application one event at a time
pub struct Runner<E: EventSource> {
    event_source: E,
    interval: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(event_source: E, interval: Duration) -> Self {
        Self {
            event_source,
            interval,
        }
    }

    /// Blocks up to the interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> DriverEvent {
        match self.event_source.recv_timeout(self.interval) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                DriverEvent::Tick
            }
        }
    }
}
