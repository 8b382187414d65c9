//! Execution engine
//!
//! [`ExecutionEngine::execute`] plans a command on the caller's thread (asking
//! for a placeholder argument if needed) and performs the plan on a fresh
//! worker thread. Failures found by the worker go to a [`Notifier`].

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::desktop::{Desktop, DesktopError};
use crate::dispatch::{plan, KeyScript, Plan, ShellFlavor};
use crate::interpreter::{ChordError, ChordSequence, ParseError, WorkflowReport, WorkflowRunner};
use crate::types::Command;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Chord(#[from] ChordError),

    #[error(transparent)]
    Desktop(#[from] DesktopError),

    #[error("{failed} of {total} workflow steps failed")]
    Workflow { failed: usize, total: usize },

    #[error("failed to start worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Result of a successful `execute` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A worker is performing the command
    Spawned(Uuid),
    /// The placeholder prompt was dismissed; nothing happened
    Cancelled,
}

/// Asks the user for the value substituted into placeholders
pub trait ArgumentPrompt: Send + Sync {
    /// `None` or an empty string cancels the execution
    fn prompt(&self, command: &Command) -> Option<String>;
}

/// Prompt for front-ends that cannot ask; every placeholder command is cancelled
pub struct NoPrompt;

impl ArgumentPrompt for NoPrompt {
    fn prompt(&self, _command: &Command) -> Option<String> {
        None
    }
}

/// Receives failures discovered after `execute` returned
pub trait Notifier: Send + Sync {
    fn execution_failed(&self, id: Uuid, command: &Command, error: &ExecutionError);
}

/// Default notifier: a warning in the log
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn execution_failed(&self, id: Uuid, command: &Command, error: &ExecutionError) {
        warn!(execution_id = %id, command = %command.command, %error, "Execution failed");
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub hotkey_delay: Duration,
    pub focus_settle: Duration,
    pub shell_flavor: ShellFlavor,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            hotkey_delay: Duration::from_millis(config.engine.hotkey_delay_ms),
            focus_settle: Duration::from_millis(config.engine.focus_settle_ms),
            shell_flavor: config.shell_flavor(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            hotkey_delay: Duration::from_millis(300),
            focus_settle: Duration::from_millis(200),
            shell_flavor: ShellFlavor::host(),
        }
    }
}

#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

/// Decrements the in-flight count when the worker ends, panics included
struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn enter(in_flight: &Arc<InFlight>) -> Self {
        *in_flight.count.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Self(in_flight.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut count = self.0.count.lock().unwrap_or_else(|p| p.into_inner());
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

#[derive(Clone)]
pub struct ExecutionEngine {
    desktop: Desktop,
    settings: EngineSettings,
    prompt: Arc<dyn ArgumentPrompt>,
    notifier: Arc<dyn Notifier>,
    in_flight: Arc<InFlight>,
}

impl ExecutionEngine {
    pub fn new(desktop: Desktop, settings: EngineSettings) -> Self {
        Self {
            desktop,
            settings,
            prompt: Arc::new(NoPrompt),
            notifier: Arc::new(LogNotifier),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn ArgumentPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Execute `command`, prompting for a placeholder argument when needed
    pub fn execute(&self, command: &Command) -> Result<Outcome, ExecutionError> {
        self.execute_with_arg(command, None)
    }

    /// Execute `command` with a pre-supplied argument
    ///
    /// The prompt is only consulted when the command needs an argument and
    /// `arg` is absent or empty.
    pub fn execute_with_arg(&self, command: &Command, arg: Option<&str>) -> Result<Outcome, ExecutionError> {
        let flavor = self.settings.shell_flavor;
        let mut planned = plan(command, arg, flavor)?;

        if matches!(planned, Plan::NeedsArgument) {
            let answer = self.prompt.prompt(command).filter(|a| !a.is_empty());
            let Some(answer) = answer else {
                info!(command = %command.command, "Execution cancelled at argument prompt");
                return Ok(Outcome::Cancelled);
            };
            planned = plan(command, Some(&answer), flavor)?;
        }

        let id = Uuid::new_v4();
        let span = info_span!("execute", execution_id = %id, category = %command.category);
        let guard = InFlightGuard::enter(&self.in_flight);
        let engine = self.clone();
        let command = command.clone();

        std::thread::Builder::new()
            .name(format!("commanddb-exec-{}", &id.simple().to_string()[..8]))
            .spawn(move || {
                let _guard = guard;
                let _entered = span.enter();
                debug!(plan = ?planned, "Worker started");
                match engine.perform(planned) {
                    Ok(()) => debug!("Worker finished"),
                    Err(error) => engine.notifier.execution_failed(id, &command, &error),
                }
            })
            .map_err(ExecutionError::Spawn)?;

        info!(execution_id = %id, "Execution spawned");
        Ok(Outcome::Spawned(id))
    }

    /// Block until no worker is running
    pub fn wait_idle(&self) {
        let mut count = self.in_flight.count.lock().unwrap_or_else(|p| p.into_inner());
        while *count > 0 {
            count = self
                .in_flight
                .idle
                .wait(count)
                .unwrap_or_else(|p| p.into_inner());
        }
    }

    /// Carry out `plan` on the current thread
    pub fn perform(&self, plan: Plan) -> Result<(), ExecutionError> {
        let desktop = &self.desktop;
        let runner = WorkflowRunner::new(
            desktop.keyboard.as_ref(),
            desktop.shell.as_ref(),
            desktop.clock.as_ref(),
        );

        match plan {
            Plan::SendKeys { focus, script } => {
                desktop.clock.sleep(self.settings.hotkey_delay);

                if let Some(title) = focus {
                    match desktop.focus.focus_window(&title) {
                        Ok(true) => desktop.clock.sleep(self.settings.focus_settle),
                        Ok(false) => debug!(%title, "No focus change"),
                        Err(error) => warn!(%title, %error, "Could not focus window"),
                    }
                }

                match script {
                    KeyScript::Chord(text) => {
                        let sequence = ChordSequence::parse(&text)?;
                        runner.send_sequence(&sequence)?;
                        Ok(())
                    }
                    KeyScript::Steps(steps) => workflow_result(runner.run(&steps)),
                }
            }
            Plan::RunWorkflow(steps) => workflow_result(runner.run(&steps)),
            Plan::Launch(line) => {
                desktop.shell.launch(&line)?;
                Ok(())
            }
            Plan::CopyToClipboard(text) => {
                desktop.clipboard.copy(&text)?;
                debug!(chars = text.chars().count(), "Copied to clipboard");
                Ok(())
            }
            Plan::NeedsArgument => Ok(()),
        }
    }
}

fn workflow_result(report: WorkflowReport) -> Result<(), ExecutionError> {
    if report.is_clean() {
        Ok(())
    } else {
        Err(ExecutionError::Workflow {
            failed: report.failures.len(),
            total: report.executed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::testing::{Action, Recorder};
    use crate::types::Category;

    #[derive(Default)]
    struct Failures(Mutex<Vec<String>>);

    impl Notifier for Failures {
        fn execution_failed(&self, _id: Uuid, _command: &Command, error: &ExecutionError) {
            self.0.lock().unwrap().push(error.to_string());
        }
    }

    struct FixedPrompt(Option<String>);

    impl ArgumentPrompt for FixedPrompt {
        fn prompt(&self, _command: &Command) -> Option<String> {
            self.0.clone()
        }
    }

    fn engine(recorder: &Arc<Recorder>, flavor: ShellFlavor) -> (ExecutionEngine, Arc<Failures>) {
        let failures = Arc::new(Failures::default());
        let settings = EngineSettings {
            shell_flavor: flavor,
            ..EngineSettings::default()
        };
        let engine = ExecutionEngine::new(Recorder::desktop(recorder), settings)
            .with_notifier(failures.clone());
        (engine, failures)
    }

    #[test]
    fn test_hotkey_waits_then_focuses_then_sends() {
        let recorder = Recorder::new();
        recorder.set_focus_changes(true);
        let (engine, failures) = engine(&recorder, ShellFlavor::Windows);

        let command = Command::new("ctrl+shift+p", Category::Hotkey).with_software("VS Code");
        assert!(matches!(engine.execute(&command).unwrap(), Outcome::Spawned(_)));
        engine.wait_idle();

        assert_eq!(
            recorder.actions(),
            vec![
                Action::Sleep(Duration::from_millis(300)),
                Action::Focus("VS Code".to_string()),
                Action::Sleep(Duration::from_millis(200)),
                Action::Chord("ctrl+shift+p".to_string()),
            ]
        );
        assert!(failures.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_settle_delay_without_focus_change() {
        let recorder = Recorder::new();
        let (engine, _) = engine(&recorder, ShellFlavor::Windows);

        let command = Command::new("f5", Category::Hotkey).with_software("Chrome");
        engine.execute(&command).unwrap();
        engine.wait_idle();

        assert_eq!(
            recorder.actions(),
            vec![
                Action::Sleep(Duration::from_millis(300)),
                Action::Focus("Chrome".to_string()),
                Action::Chord("F5".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_single_hotkey_is_reported() {
        let recorder = Recorder::new();
        let (engine, failures) = engine(&recorder, ShellFlavor::Windows);

        engine.execute(&Command::new("ctrl+banana", Category::Hotkey)).unwrap();
        engine.wait_idle();

        assert_eq!(failures.0.lock().unwrap().as_slice(), ["unknown key 'banana'"]);
    }

    #[test]
    fn test_cancelled_prompt_has_no_side_effect() {
        let recorder = Recorder::new();
        let (engine, _) = engine(&recorder, ShellFlavor::Windows);
        let engine = engine.with_prompt(Arc::new(FixedPrompt(None)));

        let outcome = engine.execute(&Command::new("ping {1}", Category::Cmd)).unwrap();
        engine.wait_idle();

        assert_eq!(outcome, Outcome::Cancelled);
        assert!(recorder.actions().is_empty());
    }

    #[test]
    fn test_empty_prompt_answer_cancels() {
        let recorder = Recorder::new();
        let (engine, _) = engine(&recorder, ShellFlavor::Windows);
        let engine = engine.with_prompt(Arc::new(FixedPrompt(Some(String::new()))));

        let outcome = engine.execute(&Command::new("ping %arg%", Category::Cmd)).unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
    }

    #[test]
    fn test_prompt_answer_is_substituted() {
        let recorder = Recorder::new();
        let (engine, _) = engine(&recorder, ShellFlavor::Windows);
        let engine = engine.with_prompt(Arc::new(FixedPrompt(Some("8.8.8.8".to_string()))));

        engine.execute(&Command::new("ping {arg}", Category::Cmd)).unwrap();
        engine.wait_idle();

        assert_eq!(
            recorder.actions(),
            vec![Action::Launch("start cmd /k \"ping 8.8.8.8\"".to_string())]
        );
    }

    #[test]
    fn test_supplied_argument_skips_prompt() {
        let recorder = Recorder::new();
        let (engine, _) = engine(&recorder, ShellFlavor::Windows);

        engine
            .execute_with_arg(&Command::new("code {1}", Category::Workflow), Some("."))
            .unwrap();
        engine.wait_idle();

        assert_eq!(recorder.actions(), vec![Action::Launch("code .".to_string())]);
    }

    #[test]
    fn test_launch_failure_reaches_notifier() {
        let recorder = Recorder::new();
        recorder.fail_launch("nope");
        let (engine, failures) = engine(&recorder, ShellFlavor::Windows);

        let outcome = engine.execute(&Command::new("nope", Category::Workflow)).unwrap();
        engine.wait_idle();

        assert!(matches!(outcome, Outcome::Spawned(_)));
        let failures = failures.0.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("nope"));
    }

    #[test]
    fn test_workflow_step_failure_is_summarized() {
        let recorder = Recorder::new();
        recorder.fail_launch("missing");
        let (engine, failures) = engine(&recorder, ShellFlavor::Windows);

        engine
            .execute(&Command::new("CMD missing ;; TYPE ok", Category::Workflow))
            .unwrap();
        engine.wait_idle();

        assert_eq!(recorder.actions(), vec![Action::Type("ok".to_string())]);
        assert_eq!(
            failures.0.lock().unwrap().as_slice(),
            ["1 of 2 workflow steps failed"]
        );
    }

    #[test]
    fn test_snippet_copies_to_clipboard() {
        let recorder = Recorder::new();
        let (engine, _) = engine(&recorder, ShellFlavor::Posix);

        engine
            .execute(&Command::new("git log --oneline", Category::Snippet))
            .unwrap();
        engine.wait_idle();

        assert_eq!(
            recorder.actions(),
            vec![Action::Copy("git log --oneline".to_string())]
        );
    }

    #[test]
    fn test_clipboard_failure_is_reported() {
        let recorder = Recorder::new();
        recorder.break_clipboard();
        let (engine, failures) = engine(&recorder, ShellFlavor::Posix);

        engine.execute(&Command::new("x", Category::Snippet)).unwrap();
        engine.wait_idle();

        assert_eq!(failures.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_wait_idle_covers_concurrent_executions() {
        let recorder = Recorder::new();
        let (engine, _) = engine(&recorder, ShellFlavor::Posix);

        for i in 0..5 {
            engine
                .execute(&Command::new(format!("TYPE {} ;; WAIT 0", i), Category::Workflow))
                .unwrap();
        }
        engine.wait_idle();

        let typed = recorder
            .actions()
            .into_iter()
            .filter(|a| matches!(a, Action::Type(_)))
            .count();
        assert_eq!(typed, 5);
    }
}
