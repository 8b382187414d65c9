//! Keyboard and focus through the `xdotool` command

use std::process::{Command, Output};

use super::{DesktopError, Keyboard, WindowFocus};
use crate::interpreter::Chord;

fn xdotool(args: &[&str]) -> Result<Output, String> {
    let output = Command::new("xdotool")
        .args(args)
        .output()
        .map_err(|e| format!("xdotool unavailable: {}", e))?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }
    Ok(output)
}

pub struct XdoKeyboard;

impl Keyboard for XdoKeyboard {
    fn send_chord(&self, chord: &Chord) -> Result<(), DesktopError> {
        let combo = chord
            .keys
            .iter()
            .map(|k| k.keysym)
            .collect::<Vec<_>>()
            .join("+");
        xdotool(&["key", "--clearmodifiers", &combo]).map_err(DesktopError::Keyboard)?;
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), DesktopError> {
        xdotool(&["type", "--clearmodifiers", "--", text]).map_err(DesktopError::Keyboard)?;
        Ok(())
    }
}

pub struct XdoFocus;

/// Escape `text` for xdotool's POSIX extended regex matching
fn regex_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl WindowFocus for XdoFocus {
    fn focus_window(&self, title: &str) -> Result<bool, DesktopError> {
        let pattern = regex_escape(title);
        // `search` exits non-zero when nothing matches.
        let found = match xdotool(&["search", "--onlyvisible", "--name", &pattern]) {
            Ok(output) => output,
            Err(_) => return Ok(false),
        };
        let stdout = String::from_utf8_lossy(&found.stdout);
        let Some(window) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return Ok(false);
        };

        let active = xdotool(&["getactivewindow"])
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
            .unwrap_or_default();
        if active == window {
            return Ok(false);
        }

        xdotool(&["windowactivate", "--sync", window]).map_err(DesktopError::Focus)?;
        Ok(true)
    }
}
