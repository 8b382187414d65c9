//! Keyword-based auto-tagging
//!
//! A record picks up every tag whose keyword list has an entry contained in
//! its description or command, plus its software name. Tags are normalized
//! to lowercase. Nothing is written until the previewed changes are applied.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::types::Command;

const DEFAULT_RULES: &str = include_str!("default_rules.toml");

/// Tag given to freshly imported records, dropped once they are tagged
pub const IMPORT_TAG: &str = "import";

/// `tag -> keywords`
#[derive(Debug, Clone, PartialEq)]
pub struct TagRules {
    rules: BTreeMap<String, Vec<String>>,
}

impl TagRules {
    pub fn builtin() -> Self {
        // Embedded table; parsing is checked by test_builtin_rules_parse.
        Self::from_toml_str(DEFAULT_RULES).unwrap_or_else(|_| Self {
            rules: BTreeMap::new(),
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let rules: BTreeMap<String, Vec<String>> =
            toml::from_str(text).context("Tag rules must be a table of keyword arrays")?;
        let rules = rules
            .into_iter()
            .map(|(tag, keywords)| {
                let keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
                (tag.to_lowercase(), keywords)
            })
            .collect();
        Ok(Self { rules })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tag rules {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid tag rules {}", path.display()))
    }

    /// Rules from `path` when given, the built-in table otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Tags whose keywords occur in `text`; `text` must already be lowercase
    fn matching(&self, text: &str) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|(tag, _)| tag.clone())
            .collect()
    }
}

/// Which records to process and how
#[derive(Debug, Clone)]
pub struct AutoTagOptions {
    /// Only records carrying at least one of these tags; all when empty
    pub tags: Vec<String>,
    /// Only records with one of these software names; all when empty
    pub software: Vec<String>,
    pub remove_import: bool,
}

impl Default for AutoTagOptions {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            software: Vec::new(),
            remove_import: true,
        }
    }
}

impl AutoTagOptions {
    fn selects(&self, command: &Command) -> bool {
        let tag_ok = self.tags.is_empty() || self.tags.iter().any(|t| command.tags.contains(t));
        let software_ok = self.software.is_empty() || self.software.contains(&command.software);
        tag_ok && software_ok
    }
}

/// A proposed tag update for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagChange {
    pub index: usize,
    pub command: String,
    pub current: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Sorted replacement tag list
    pub tags: Vec<String>,
}

/// Compute tag changes without touching `records`
pub fn preview(records: &[Command], rules: &TagRules, options: &AutoTagOptions) -> Vec<TagChange> {
    records
        .iter()
        .enumerate()
        .filter(|(_, c)| options.selects(c))
        .filter_map(|(index, command)| propose(index, command, rules, options))
        .collect()
}

fn propose(index: usize, command: &Command, rules: &TagRules, options: &AutoTagOptions) -> Option<TagChange> {
    let current: BTreeSet<String> = command.tags.iter().map(|t| t.to_lowercase()).collect();

    let scanned = format!("{} {}", command.description, command.command).to_lowercase();
    let mut proposed = rules.matching(&scanned);

    let software = command.software.trim().to_lowercase();
    if !software.is_empty() && software != "general" {
        proposed.insert(software);
    }

    let mut tags: BTreeSet<String> = current.union(&proposed).cloned().collect();
    let mut removed = Vec::new();
    if options.remove_import && tags.remove(IMPORT_TAG) && current.contains(IMPORT_TAG) {
        removed.push(IMPORT_TAG.to_string());
    }

    if tags == current {
        return None;
    }

    Some(TagChange {
        index,
        command: command.command.clone(),
        current: command.tags.clone(),
        added: tags.difference(&current).cloned().collect(),
        removed,
        tags: tags.into_iter().collect(),
    })
}

/// Write previewed changes into `records`
///
/// Returns how many records were updated.
pub fn apply(records: &mut [Command], changes: &[TagChange]) -> usize {
    let mut updated = 0;
    for change in changes {
        if let Some(record) = records.get_mut(change.index) {
            record.tags = change.tags.clone();
            updated += 1;
        }
    }
    updated
}
