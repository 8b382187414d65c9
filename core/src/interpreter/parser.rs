use pest::Parser;
use pest_derive::Parser;
use std::time::Duration;
use thiserror::Error;

use super::chord::{ChordError, ChordSequence};

#[derive(Parser)]
#[grammar = "interpreter/grammar.pest"]
pub(crate) struct Grammar;

/// Step separator for workflow strings
pub const STEP_SEPARATOR: &str = ";;";

/// Separator for two-phase sequence commands (`win+x > a`)
pub const SEQUENCE_SEPARATOR: char = '>';

/// Pause inserted between the parts of a sequence command
pub const SEQUENCE_PAUSE: Duration = Duration::from_millis(500);

/// Words that mark a step as a hotkey even when it contains spaces
const MODIFIER_WORDS: [&str; 4] = ["ctrl", "alt", "shift", "win"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed workflow: {0}")]
    Workflow(String),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::Workflow(err.to_string())
    }
}

/* ===================== Steps ===================== */

/// One step of a workflow
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `WAIT <seconds>`; `None` when the duration was malformed
    Wait(Option<Duration>),
    /// `CMD <line>`
    ShellCall(String),
    /// `TYPE <text>`
    TypeText(String),
    /// Anything else; see [`classify`]
    Heuristic(String),
}

/// How a heuristic step is performed
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    TypeText(String),
    /// A chord, with the raw text kept for the typing fallback
    Chord {
        text: String,
        parsed: Result<ChordSequence, ChordError>,
    },
}

/// Whether `text` is a workflow rather than a single action
pub fn is_workflow(text: &str) -> bool {
    text.contains(STEP_SEPARATOR)
}

/// Whether `text` uses sequence notation
pub fn is_sequence(text: &str) -> bool {
    text.contains(SEQUENCE_SEPARATOR)
}

/// Rewrite `a > b > c` as a workflow with a fixed pause between parts
pub fn expand_sequence(text: &str) -> String {
    let joiner = format!(
        " {sep} WAIT {} {sep} ",
        SEQUENCE_PAUSE.as_secs_f64(),
        sep = STEP_SEPARATOR
    );
    text.split(SEQUENCE_SEPARATOR)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(&joiner)
}

/// Split a workflow into its steps, dropping empty ones
pub fn parse_workflow(text: &str) -> Result<Vec<Step>, ParseError> {
    let workflow = Grammar::parse(Rule::workflow, text)?
        .next()
        .ok_or_else(|| ParseError::Workflow(text.to_string()))?;

    Ok(workflow
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::step)
        .map(|pair| pair.as_str().trim())
        .filter(|step| !step.is_empty())
        .map(parse_step)
        .collect())
}

/// Parse a single trimmed step
///
/// Prefixes are matched case-insensitively and include their trailing space,
/// so a bare `WAIT` is a heuristic step.
pub fn parse_step(text: &str) -> Step {
    if let Some(rest) = strip_prefix_ignore_case(text, "WAIT ") {
        return Step::Wait(parse_seconds(rest));
    }
    if let Some(rest) = strip_prefix_ignore_case(text, "CMD ") {
        return Step::ShellCall(rest.trim().to_string());
    }
    if let Some(rest) = strip_prefix_ignore_case(text, "TYPE ") {
        return Step::TypeText(rest.trim().to_string());
    }
    Step::Heuristic(text.to_string())
}

/// Decide whether a heuristic step is typed or sent as a chord
///
/// Text with a space and no modifier word is typed. Everything else is parsed
/// as a chord; the caller types the text when that parse fails.
pub fn classify(text: &str) -> Classified {
    let lower = text.to_lowercase();
    if text.contains(' ') && !MODIFIER_WORDS.iter().any(|word| lower.contains(word)) {
        return Classified::TypeText(text.to_string());
    }

    Classified::Chord {
        text: text.to_string(),
        parsed: ChordSequence::parse(text),
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

fn parse_seconds(text: &str) -> Option<Duration> {
    let seconds: f64 = text.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}
