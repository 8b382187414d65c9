use tracing::{debug, warn};

use super::chord::ChordSequence;
use super::parser::{classify, Classified, Step};
use crate::desktop::{Clock, DesktopError, Keyboard, ShellLauncher};

/// What a single step did
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    Slept,
    /// `WAIT` with an unparsable duration
    SkippedWait,
    Launched,
    Typed,
    SentChord,
    /// A heuristic step that was not a valid chord and was typed instead
    TypedFallback,
}

#[derive(Debug)]
pub struct StepFailure {
    pub index: usize,
    pub step: Step,
    pub error: DesktopError,
}

/// Summary of one workflow run
#[derive(Debug, Default)]
pub struct WorkflowReport {
    /// Steps attempted, failed ones included
    pub executed: usize,
    pub results: Vec<StepResult>,
    pub failures: Vec<StepFailure>,
}

impl WorkflowReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Executes parsed steps in order against the desktop backends
///
/// A failing step is logged and recorded; the run always continues with the
/// next step.
pub struct WorkflowRunner<'a> {
    keyboard: &'a dyn Keyboard,
    shell: &'a dyn ShellLauncher,
    clock: &'a dyn Clock,
}

impl<'a> WorkflowRunner<'a> {
    pub fn new(keyboard: &'a dyn Keyboard, shell: &'a dyn ShellLauncher, clock: &'a dyn Clock) -> Self {
        Self {
            keyboard,
            shell,
            clock,
        }
    }

    pub fn run(&self, steps: &[Step]) -> WorkflowReport {
        let mut report = WorkflowReport::default();

        for (index, step) in steps.iter().enumerate() {
            report.executed += 1;
            match self.run_step(step) {
                Ok(result) => {
                    debug!(index, ?result, "Workflow step done");
                    report.results.push(result);
                }
                Err(error) => {
                    warn!(index, ?step, %error, "Workflow step failed");
                    report.failures.push(StepFailure {
                        index,
                        step: step.clone(),
                        error,
                    });
                }
            }
        }

        report
    }

    pub fn run_step(&self, step: &Step) -> Result<StepResult, DesktopError> {
        match step {
            Step::Wait(Some(duration)) => {
                self.clock.sleep(*duration);
                Ok(StepResult::Slept)
            }
            Step::Wait(None) => {
                debug!("Ignoring WAIT with malformed duration");
                Ok(StepResult::SkippedWait)
            }
            Step::ShellCall(line) => {
                self.shell.launch(line)?;
                Ok(StepResult::Launched)
            }
            Step::TypeText(text) => {
                self.keyboard.type_text(text)?;
                Ok(StepResult::Typed)
            }
            Step::Heuristic(text) => match classify(text) {
                Classified::TypeText(text) => {
                    self.keyboard.type_text(&text)?;
                    Ok(StepResult::Typed)
                }
                Classified::Chord { parsed: Ok(sequence), .. } => {
                    self.send_sequence(&sequence)?;
                    Ok(StepResult::SentChord)
                }
                Classified::Chord { text, parsed: Err(error) } => {
                    debug!(%error, "Not a hotkey, typing instead");
                    self.keyboard.type_text(&text)?;
                    Ok(StepResult::TypedFallback)
                }
            },
        }
    }

    pub fn send_sequence(&self, sequence: &ChordSequence) -> Result<(), DesktopError> {
        for chord in &sequence.chords {
            self.keyboard.send_chord(chord)?;
        }
        Ok(())
    }
}
