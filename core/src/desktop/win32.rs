//! Win32 keyboard and focus backends

use std::mem;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, TRUE};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetForegroundWindow, GetWindowTextW, IsIconic, IsWindowVisible,
    SetForegroundWindow, ShowWindow, SW_RESTORE,
};

use super::{DesktopError, Keyboard, WindowFocus};
use crate::interpreter::Chord;

pub struct Win32Keyboard;

/// Keys that need `KEYEVENTF_EXTENDEDKEY` to be told apart from their numpad twins
fn is_extended(vk: u16) -> bool {
    matches!(
        vk,
        0x21..=0x28 // page up/down, end, home, arrows
            | 0x2C | 0x2D | 0x2E // print screen, insert, delete
            | 0x5B | 0x5C | 0x5D // windows keys, apps
            | 0x6F | 0x90 // numpad divide, num lock
            | 0xA3 | 0xA5 // right ctrl, right alt
    )
}

fn key_event(vk: u16, up: bool) -> INPUT {
    let mut flags = if is_extended(vk) {
        KEYEVENTF_EXTENDEDKEY
    } else {
        KEYBD_EVENT_FLAGS(0)
    };
    if up {
        flags |= KEYEVENTF_KEYUP;
    }
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn unicode_event(unit: u16, up: bool) -> INPUT {
    let mut flags = KEYEVENTF_UNICODE;
    if up {
        flags |= KEYEVENTF_KEYUP;
    }
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(0),
                wScan: unit,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn send(inputs: &[INPUT]) -> Result<(), DesktopError> {
    if inputs.is_empty() {
        return Ok(());
    }
    let sent = unsafe { SendInput(inputs, mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        return Err(DesktopError::Keyboard(format!(
            "SendInput accepted {} of {} events",
            sent,
            inputs.len()
        )));
    }
    Ok(())
}

impl Keyboard for Win32Keyboard {
    fn send_chord(&self, chord: &Chord) -> Result<(), DesktopError> {
        let mut inputs: Vec<INPUT> = chord.keys.iter().map(|k| key_event(k.vk, false)).collect();
        inputs.extend(chord.keys.iter().rev().map(|k| key_event(k.vk, true)));
        send(&inputs)
    }

    fn type_text(&self, text: &str) -> Result<(), DesktopError> {
        let inputs: Vec<INPUT> = text
            .encode_utf16()
            .flat_map(|unit| [unicode_event(unit, false), unicode_event(unit, true)])
            .collect();
        send(&inputs)
    }
}

pub struct Win32Focus;

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let found = &mut *(lparam.0 as *mut Vec<isize>);
    found.push(hwnd.0 as isize);
    TRUE
}

fn window_title(hwnd: HWND) -> String {
    let mut buf = [0u16; 512];
    let len = unsafe { GetWindowTextW(hwnd, &mut buf) };
    String::from_utf16_lossy(&buf[..len.max(0) as usize])
}

impl WindowFocus for Win32Focus {
    fn focus_window(&self, title: &str) -> Result<bool, DesktopError> {
        let needle = title.to_lowercase();
        let mut handles: Vec<isize> = Vec::new();
        unsafe {
            EnumWindows(
                Some(collect_window),
                LPARAM(&mut handles as *mut Vec<isize> as isize),
            )
        }
        .map_err(|e| DesktopError::Focus(e.to_string()))?;

        let target = handles.into_iter().map(|h| HWND(h as *mut _)).find(|&hwnd| {
            unsafe { IsWindowVisible(hwnd) }.as_bool()
                && window_title(hwnd).to_lowercase().contains(&needle)
        });

        let Some(hwnd) = target else {
            return Ok(false);
        };

        unsafe {
            if GetForegroundWindow() == hwnd {
                return Ok(false);
            }
            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
            if !SetForegroundWindow(hwnd).as_bool() {
                return Err(DesktopError::Focus(format!(
                    "window '{}' refused the foreground",
                    window_title(hwnd)
                )));
            }
        }
        Ok(true)
    }
}
