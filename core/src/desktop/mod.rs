//! OS-facing side effects
//!
//! Everything that touches the keyboard, windows, clipboard, processes or the
//! wall clock goes through the traits here so that execution logic can be
//! driven by recording doubles in tests.

mod clipboard;
mod shell;

#[cfg(windows)]
mod win32;
#[cfg(not(windows))]
mod xdotool;

#[cfg(test)]
pub(crate) mod testing;

pub use clipboard::SystemClipboard;
pub use shell::SystemShell;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::interpreter::Chord;

#[derive(Debug, Error)]
pub enum DesktopError {
    #[error("failed to launch '{line}': {source}")]
    Launch {
        line: String,
        #[source]
        source: std::io::Error,
    },

    #[error("keyboard input failed: {0}")]
    Keyboard(String),

    #[error("window focus failed: {0}")]
    Focus(String),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

pub trait Keyboard: Send + Sync {
    /// Press every key of `chord` in order, then release them in reverse
    fn send_chord(&self, chord: &Chord) -> Result<(), DesktopError>;

    /// Type `text` literally into the focused window
    fn type_text(&self, text: &str) -> Result<(), DesktopError>;
}

pub trait WindowFocus: Send + Sync {
    /// Bring a window whose title contains `title` to the foreground
    ///
    /// Returns `true` only when the foreground window actually changed.
    fn focus_window(&self, title: &str) -> Result<bool, DesktopError>;
}

pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> Result<(), DesktopError>;
}

pub trait ShellLauncher: Send + Sync {
    /// Start `line` through the platform shell without waiting for it
    fn launch(&self, line: &str) -> Result<(), DesktopError>;
}

pub trait Clock: Send + Sync {
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// The full set of backends an engine drives
#[derive(Clone)]
pub struct Desktop {
    pub keyboard: Arc<dyn Keyboard>,
    pub focus: Arc<dyn WindowFocus>,
    pub clipboard: Arc<dyn Clipboard>,
    pub shell: Arc<dyn ShellLauncher>,
    pub clock: Arc<dyn Clock>,
}

impl Desktop {
    /// Backends for the host platform
    pub fn system() -> Self {
        #[cfg(windows)]
        let (keyboard, focus): (Arc<dyn Keyboard>, Arc<dyn WindowFocus>) =
            (Arc::new(win32::Win32Keyboard), Arc::new(win32::Win32Focus));
        #[cfg(not(windows))]
        let (keyboard, focus): (Arc<dyn Keyboard>, Arc<dyn WindowFocus>) =
            (Arc::new(xdotool::XdoKeyboard), Arc::new(xdotool::XdoFocus));

        Self {
            keyboard,
            focus,
            clipboard: Arc::new(SystemClipboard),
            shell: Arc::new(SystemShell),
            clock: Arc::new(SystemClock),
        }
    }
}
