//! Workflow interpreter
//!
//! A workflow is a `;;`-separated list of steps:
//!
//! ```text
//! win+r ;; WAIT 0.5 ;; TYPE notepad ;; enter
//! ```
//!
//! `WAIT <seconds>`, `CMD <line>` and `TYPE <text>` are explicit. Any other
//! step is typed when it looks like prose and sent as a hotkey otherwise.
//! Parsing produces [`Step`] values; [`WorkflowRunner`] performs them.

pub mod chord;
pub mod executor;
pub mod parser;

#[cfg(test)]
mod tests;

pub use chord::{Chord, ChordError, ChordSequence, Key};
pub use executor::{StepFailure, StepResult, WorkflowReport, WorkflowRunner};
pub use parser::{
    classify, expand_sequence, is_sequence, is_workflow, parse_step, parse_workflow, Classified,
    ParseError, Step, SEQUENCE_PAUSE,
};
