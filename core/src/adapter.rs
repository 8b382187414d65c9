//! Front-end Interface
//!
//! The stable API surface for front-ends (the CLI, a tray widget, an editor
//! dashboard). Front-ends should only call functions from this module.
//!
//! ## Design Principles
//!
//! 1. **Stable Interface**: these signatures are the contract with front-ends
//! 2. **Thin Wrapper**: each function delegates to a core module
//! 3. **Guarded Writes**: wholesale saves always pass the full-set check

use anyhow::{Context, Result};

use crate::application::Application;
use crate::engine::{ExecutionError, Outcome};
use crate::search::{search, SearchQuery};
use crate::store::{AppendSummary, BackupTag, SaveGuard};
use crate::tagging::{self, AutoTagOptions, TagChange};
use crate::types::Command;

/* ===================== Store ===================== */

/// Every stored command; empty when the store is missing or unreadable
pub fn load_commands(app: &Application) -> Vec<Command> {
    app.store.load()
}

/// Append records, skipping duplicates
pub fn append_commands(app: &Application, records: Vec<Command>, tag: BackupTag) -> Result<AppendSummary> {
    app.store
        .append_deduplicated(records, tag)
        .context("Failed to append commands")
}

/// Quick-add a single record
pub fn add_command(app: &Application, record: Command) -> Result<AppendSummary> {
    app.store.append(record).context("Failed to add command")
}

/// Save an edited record set
///
/// `total` is the number of records the editor loaded; saving fewer (or more)
/// means the editor holds a filtered view and the save is refused.
pub fn replace_commands(app: &Application, records: &[Command], total: usize) -> Result<()> {
    SaveGuard::check(records.len(), total)?;
    app.store.replace(records).context("Failed to save commands")
}

/// Delete the record at `index`
pub fn remove_command(app: &Application, index: usize) -> Result<Command> {
    app.store
        .remove(index)
        .with_context(|| format!("Failed to remove command {}", index))
}

/* ===================== Lookup ===================== */

/// Matching records with their store indices
pub fn search_commands(app: &Application, query: &SearchQuery) -> Vec<(usize, Command)> {
    let records = app.store.load();
    search(&records, query)
        .into_iter()
        .map(|hit| (hit.index, hit.command.clone()))
        .collect()
}

/* ===================== Execution ===================== */

/// Substitute `arg` into every placeholder of `template`
pub fn resolve_placeholders(template: &str, arg: &str) -> String {
    crate::placeholder::resolve(template, arg)
}

/// Execute a command without blocking
pub fn execute_command(app: &Application, command: &Command, arg: Option<&str>) -> Result<Outcome, ExecutionError> {
    app.engine.execute_with_arg(command, arg)
}

/* ===================== Auto-tagging ===================== */

/// Proposed tag changes across the store
pub fn preview_tags(app: &Application, options: &AutoTagOptions) -> Vec<TagChange> {
    tagging::preview(&app.store.load(), &app.tag_rules, options)
}

/// Compute and save tag changes, returning what was applied
pub fn apply_tags(app: &Application, options: &AutoTagOptions) -> Result<Vec<TagChange>> {
    let mut records = app.store.load();
    let total = records.len();
    let changes = tagging::preview(&records, &app.tag_rules, options);
    if changes.is_empty() {
        return Ok(changes);
    }

    tagging::apply(&mut records, &changes);
    replace_commands(app, &records, total)?;
    Ok(changes)
}
