//! Category dispatch
//!
//! Turns a stored command into a [`Plan`] without performing anything. The
//! engine carries plans out; keeping the two apart makes every wrapping rule
//! visible and testable on any host.

use serde::Deserialize;

use crate::interpreter::{expand_sequence, is_sequence, is_workflow, parse_workflow, ParseError, Step};
use crate::placeholder::{has_placeholder, resolve};
use crate::types::{Category, Command};

/// Software names that never get a focus attempt
const UNFOCUSED_SOFTWARE: [&str; 2] = ["General", "Windows"];

/// Shell syntax used when wrapping commands for a visible terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellFlavor {
    Windows,
    Posix,
}

impl ShellFlavor {
    pub fn host() -> Self {
        if cfg!(windows) {
            ShellFlavor::Windows
        } else {
            ShellFlavor::Posix
        }
    }

    /// Open a terminal that runs `line` and stays open afterwards
    pub fn wrap_cmd(&self, line: &str) -> String {
        match self {
            ShellFlavor::Windows => format!("start cmd /k \"{}\"", line),
            ShellFlavor::Posix => format!(
                "x-terminal-emulator -e sh -c {}",
                single_quote(&format!("{}; exec sh", line))
            ),
        }
    }

    /// Open a PowerShell session that runs `line` and does not exit
    pub fn wrap_powershell(&self, line: &str) -> String {
        match self {
            ShellFlavor::Windows => format!("start powershell -NoExit -Command \"{}\"", line),
            ShellFlavor::Posix => format!(
                "x-terminal-emulator -e pwsh -NoExit -Command {}",
                single_quote(line)
            ),
        }
    }
}

fn single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Key input for a hotkey command
#[derive(Debug, Clone, PartialEq)]
pub enum KeyScript {
    /// A single chord (or comma-separated chords); must parse
    Chord(String),
    Steps(Vec<Step>),
}

/// What executing a command will do
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    SendKeys {
        /// Title fragment of the window to bring forward first
        focus: Option<String>,
        script: KeyScript,
    },
    RunWorkflow(Vec<Step>),
    Launch(String),
    CopyToClipboard(String),
    /// The command has placeholders and no argument was supplied
    NeedsArgument,
}

/// Plan the execution of `command`
///
/// `arg` substitutes placeholders in shell categories; an empty argument
/// counts as none.
pub fn plan(command: &Command, arg: Option<&str>, flavor: ShellFlavor) -> Result<Plan, ParseError> {
    let text = command.command.as_str();

    match &command.category {
        Category::Hotkey => {
            let focus = focus_target(&command.software);
            let script = if is_workflow(text) {
                KeyScript::Steps(parse_workflow(text)?)
            } else if is_sequence(text) {
                KeyScript::Steps(parse_workflow(&expand_sequence(text))?)
            } else {
                KeyScript::Chord(text.trim().to_string())
            };
            Ok(Plan::SendKeys { focus, script })
        }

        category if category.is_shell() => {
            let line = if has_placeholder(text) {
                match arg.filter(|a| !a.is_empty()) {
                    Some(arg) => resolve(text, arg),
                    None => return Ok(Plan::NeedsArgument),
                }
            } else {
                text.to_string()
            };

            let line = match category {
                Category::RunPanel if is_sequence(&line) => expand_sequence(&line),
                Category::Cmd if !is_workflow(&line) => flavor.wrap_cmd(&line),
                Category::PowerShell if !is_workflow(&line) => flavor.wrap_powershell(&line),
                _ => line,
            };

            if is_workflow(&line) {
                Ok(Plan::RunWorkflow(parse_workflow(&line)?))
            } else {
                Ok(Plan::Launch(line))
            }
        }

        _ => Ok(Plan::CopyToClipboard(command.command.clone())),
    }
}

fn focus_target(software: &str) -> Option<String> {
    let software = software.trim();
    if software.is_empty() || UNFOCUSED_SOFTWARE.contains(&software) {
        None
    } else {
        Some(software.to_string())
    }
}
