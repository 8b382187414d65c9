//! Hotkey chords
//!
//! A chord is a set of keys pressed together (`ctrl+shift+esc`); a chord
//! sequence is several chords sent one after another (`ctrl+k, ctrl+c`).
//! Key names are case-insensitive.

use pest::Parser;
use std::fmt;
use thiserror::Error;

use super::parser::{Grammar, Rule};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordError {
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("invalid hotkey '{0}'")]
    Syntax(String),
}

/// A physical key, addressable on every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    /// Windows virtual-key code
    pub vk: u16,
    /// X11 keysym name
    pub keysym: &'static str,
}

const fn key(vk: u16, keysym: &'static str) -> Key {
    Key { vk, keysym }
}

const LETTERS: [&str; 26] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z",
];
const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
const FUNCTION_KEYS: [&str; 24] = [
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "F13", "F14",
    "F15", "F16", "F17", "F18", "F19", "F20", "F21", "F22", "F23", "F24",
];
const NUMPAD: [&str; 10] = [
    "KP_0", "KP_1", "KP_2", "KP_3", "KP_4", "KP_5", "KP_6", "KP_7", "KP_8", "KP_9",
];

impl Key {
    /// Look up a key by name
    ///
    /// Inner whitespace is collapsed, so `page up` and `page  up` agree.
    pub fn from_name(name: &str) -> Option<Key> {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let bytes = name.as_bytes();

        if bytes.len() == 1 {
            let b = bytes[0];
            if b.is_ascii_lowercase() {
                let i = (b - b'a') as usize;
                return Some(key(0x41 + i as u16, LETTERS[i]));
            }
            if b.is_ascii_digit() {
                let i = (b - b'0') as usize;
                return Some(key(0x30 + i as u16, DIGITS[i]));
            }
        }

        if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
            if (1..=24).contains(&n) {
                return Some(key(0x70 + (n - 1) as u16, FUNCTION_KEYS[n - 1]));
            }
        }

        if let Some(n) = name
            .strip_prefix("numpad")
            .or_else(|| name.strip_prefix("num"))
            .map(str::trim_start)
            .and_then(|n| n.parse::<usize>().ok())
        {
            if n <= 9 {
                return Some(key(0x60 + n as u16, NUMPAD[n]));
            }
        }

        let found = match name.as_str() {
            // Modifiers
            "ctrl" | "control" => key(0x11, "ctrl"),
            "left ctrl" | "lctrl" => key(0xA2, "Control_L"),
            "right ctrl" | "rctrl" => key(0xA3, "Control_R"),
            "alt" | "menu" => key(0x12, "alt"),
            "left alt" | "lalt" => key(0xA4, "Alt_L"),
            "right alt" | "ralt" | "alt gr" | "altgr" => key(0xA5, "Alt_R"),
            "shift" => key(0x10, "shift"),
            "left shift" | "lshift" => key(0xA0, "Shift_L"),
            "right shift" | "rshift" => key(0xA1, "Shift_R"),
            "win" | "windows" | "left windows" | "lwin" | "super" => key(0x5B, "super"),
            "right windows" | "rwin" => key(0x5C, "Super_R"),
            "apps" | "application" => key(0x5D, "Menu"),
            // Navigation and editing
            "enter" | "return" => key(0x0D, "Return"),
            "tab" => key(0x09, "Tab"),
            "escape" | "esc" => key(0x1B, "Escape"),
            "space" | "spacebar" => key(0x20, "space"),
            "backspace" | "bs" => key(0x08, "BackSpace"),
            "delete" | "del" => key(0x2E, "Delete"),
            "insert" | "ins" => key(0x2D, "Insert"),
            "home" => key(0x24, "Home"),
            "end" => key(0x23, "End"),
            "page up" | "pageup" | "pgup" => key(0x21, "Prior"),
            "page down" | "pagedown" | "pgdn" => key(0x22, "Next"),
            "up" => key(0x26, "Up"),
            "down" => key(0x28, "Down"),
            "left" => key(0x25, "Left"),
            "right" => key(0x27, "Right"),
            // Locks and system
            "print screen" | "printscreen" | "prtsc" => key(0x2C, "Print"),
            "scroll lock" | "scrolllock" => key(0x91, "Scroll_Lock"),
            "pause" | "break" => key(0x13, "Pause"),
            "num lock" | "numlock" => key(0x90, "Num_Lock"),
            "caps lock" | "capslock" | "caps" => key(0x14, "Caps_Lock"),
            // Punctuation
            ";" | "semicolon" => key(0xBA, "semicolon"),
            "=" | "equals" | "equal" => key(0xBB, "equal"),
            "plus" => key(0xBB, "plus"),
            "comma" => key(0xBC, "comma"),
            "-" | "minus" => key(0xBD, "minus"),
            "." | "period" | "dot" => key(0xBE, "period"),
            "/" | "slash" => key(0xBF, "slash"),
            "`" | "backtick" | "grave" => key(0xC0, "grave"),
            "[" | "lbracket" => key(0xDB, "bracketleft"),
            "\\" | "backslash" => key(0xDC, "backslash"),
            "]" | "rbracket" => key(0xDD, "bracketright"),
            "'" | "quote" => key(0xDE, "apostrophe"),
            // Numpad operators
            "multiply" | "num *" | "num*" => key(0x6A, "KP_Multiply"),
            "add" | "num +" => key(0x6B, "KP_Add"),
            "subtract" | "num -" | "num-" => key(0x6D, "KP_Subtract"),
            "decimal" | "num ." | "num." => key(0x6E, "KP_Decimal"),
            "divide" | "num /" | "num/" => key(0x6F, "KP_Divide"),
            // Media
            "volume up" | "volumeup" => key(0xAF, "XF86AudioRaiseVolume"),
            "volume down" | "volumedown" => key(0xAE, "XF86AudioLowerVolume"),
            "volume mute" | "volumemute" | "mute" => key(0xAD, "XF86AudioMute"),
            "play/pause media" | "playpause" | "play pause" => key(0xB3, "XF86AudioPlay"),
            "next track" | "nexttrack" => key(0xB0, "XF86AudioNext"),
            "previous track" | "prevtrack" => key(0xB1, "XF86AudioPrev"),
            "stop media" | "stopmedia" => key(0xB2, "XF86AudioStop"),
            _ => return None,
        };
        Some(found)
    }
}

/// Keys pressed in order and released in reverse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    pub keys: Vec<Key>,
}

/// Chords sent one after another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordSequence {
    pub chords: Vec<Chord>,
}

impl ChordSequence {
    pub fn parse(text: &str) -> Result<Self, ChordError> {
        let sequence = Grammar::parse(Rule::chord_sequence, text)
            .map_err(|_| ChordError::Syntax(text.to_string()))?
            .next()
            .ok_or_else(|| ChordError::Syntax(text.to_string()))?;

        let mut chords = Vec::new();
        for chord in sequence.into_inner().filter(|p| p.as_rule() == Rule::chord) {
            let keys = chord
                .into_inner()
                .map(|name| {
                    Key::from_name(name.as_str())
                        .ok_or_else(|| ChordError::UnknownKey(name.as_str().to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            chords.push(Chord { keys });
        }

        Ok(Self { chords })
    }
}

impl fmt::Display for ChordSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chords: Vec<String> = self
            .chords
            .iter()
            .map(|c| c.keys.iter().map(|k| k.keysym).collect::<Vec<_>>().join("+"))
            .collect();
        f.write_str(&chords.join(", "))
    }
}
