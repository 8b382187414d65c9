//! Recording desktop for tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Chord(String),
    Type(String),
    Focus(String),
    Copy(String),
    Launch(String),
    Sleep(Duration),
}

/// Records every side effect in order instead of performing it
#[derive(Default)]
pub struct Recorder {
    actions: Mutex<Vec<Action>>,
    /// Lines whose launch fails
    failing_launches: Mutex<Vec<String>>,
    /// Whether `focus_window` reports a foreground change
    focus_changes: Mutex<bool>,
    clipboard_broken: Mutex<bool>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn fail_launch(&self, line: &str) {
        self.failing_launches.lock().unwrap().push(line.to_string());
    }

    pub fn set_focus_changes(&self, changes: bool) {
        *self.focus_changes.lock().unwrap() = changes;
    }

    pub fn break_clipboard(&self) {
        *self.clipboard_broken.lock().unwrap() = true;
    }

    fn push(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }

    /// A [`Desktop`] whose every backend records into `recorder`
    pub fn desktop(recorder: &Arc<Self>) -> Desktop {
        Desktop {
            keyboard: recorder.clone(),
            focus: recorder.clone(),
            clipboard: recorder.clone(),
            shell: recorder.clone(),
            clock: recorder.clone(),
        }
    }
}

impl Keyboard for Recorder {
    fn send_chord(&self, chord: &Chord) -> Result<(), DesktopError> {
        let combo = chord
            .keys
            .iter()
            .map(|k| k.keysym)
            .collect::<Vec<_>>()
            .join("+");
        self.push(Action::Chord(combo));
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), DesktopError> {
        self.push(Action::Type(text.to_string()));
        Ok(())
    }
}

impl WindowFocus for Recorder {
    fn focus_window(&self, title: &str) -> Result<bool, DesktopError> {
        self.push(Action::Focus(title.to_string()));
        Ok(*self.focus_changes.lock().unwrap())
    }
}

impl Clipboard for Recorder {
    fn copy(&self, text: &str) -> Result<(), DesktopError> {
        if *self.clipboard_broken.lock().unwrap() {
            return Err(DesktopError::Clipboard("no display".to_string()));
        }
        self.push(Action::Copy(text.to_string()));
        Ok(())
    }
}

impl ShellLauncher for Recorder {
    fn launch(&self, line: &str) -> Result<(), DesktopError> {
        if self.failing_launches.lock().unwrap().iter().any(|l| l == line) {
            return Err(DesktopError::Launch {
                line: line.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        self.push(Action::Launch(line.to_string()));
        Ok(())
    }
}

impl Clock for Recorder {
    fn sleep(&self, duration: Duration) {
        self.push(Action::Sleep(duration));
    }
}
