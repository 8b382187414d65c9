//! Case-insensitive substring search over stored commands

use std::collections::BTreeSet;

use crate::types::Command;

/// Filters applied by [`search`]
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Substring matched against command, description, software and tags
    pub text: String,
    /// Exact software name to restrict to
    pub software: Option<String>,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn software(mut self, software: Option<String>) -> Self {
        self.software = software;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// A matching record and its position in the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub index: usize,
    pub command: &'a Command,
}

/// Records matching `query`, in store order
///
/// An empty query text matches everything.
pub fn search<'a>(records: &'a [Command], query: &SearchQuery) -> Vec<SearchHit<'a>> {
    let needle = query.text.trim().to_lowercase();

    records
        .iter()
        .enumerate()
        .filter(|(_, c)| match &query.software {
            Some(software) => &c.software == software,
            None => true,
        })
        .filter(|(_, c)| needle.is_empty() || c.search_text().contains(&needle))
        .map(|(index, command)| SearchHit { index, command })
        .take(query.limit.unwrap_or(usize::MAX))
        .collect()
}

/// Distinct software names, sorted
pub fn software_names(records: &[Command]) -> Vec<String> {
    records
        .iter()
        .map(|c| c.software.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
