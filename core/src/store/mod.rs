//! Command store
//!
//! Owns the on-disk record list. Every mutation follows the same sequence
//! under the write lock: load the current records, copy the current file into
//! the backup directory, then atomically replace the file.

mod backup;
mod lock;

#[cfg(test)]
mod tests;

pub use backup::{backup_file_name, BackupTag};

use chrono::Local;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::types::{Command, CommandIdentity};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize commands: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("record {index} has an empty command")]
    EmptyCommand { index: usize },

    #[error("refusing to save a filtered view ({visible} of {total} records visible)")]
    PartialView { visible: usize, total: usize },

    #[error("no record at index {index} (store holds {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl StoreError {
    pub(crate) fn io(action: &str, path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            action: action.to_string(),
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Guard for editors that may be showing a filtered subset of the store
///
/// A wholesale `replace` from such a view would silently drop every hidden
/// record, so the caller must prove it holds the full set first.
pub struct SaveGuard;

impl SaveGuard {
    pub fn check(visible: usize, total: usize) -> Result<(), StoreError> {
        if visible != total {
            return Err(StoreError::PartialView { visible, total });
        }
        Ok(())
    }
}

/// Result of a deduplicating append
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppendSummary {
    pub added: usize,
    pub skipped: usize,
}

pub struct CommandStore {
    path: PathBuf,
    backup_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl CommandStore {
    pub fn new(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_dir: backup_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.store_path(), config.backup_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Read every record
    ///
    /// A missing or unreadable file yields an empty list; the problem is
    /// logged, never returned.
    pub fn load(&self) -> Vec<Command> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Store file does not exist yet");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read store file");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Command>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Store file is not a valid command list");
                Vec::new()
            }
        }
    }

    /// Copy the current file into the backup directory
    ///
    /// Returns the backup's path, or `None` when there is no file yet.
    pub fn backup(&self, tag: BackupTag) -> Result<Option<PathBuf>, StoreError> {
        let created = backup::copy_to_backup(&self.path, &self.backup_dir, tag, Local::now())?;
        if let Some(path) = &created {
            debug!(backup = %path.display(), %tag, "Backed up store");
        }
        Ok(created)
    }

    /// Merge `records` into the store, skipping duplicates and blank commands
    ///
    /// Duplicates are checked against the stored records and against earlier
    /// candidates in the same batch.
    pub fn append_deduplicated(
        &self,
        records: Vec<Command>,
        tag: BackupTag,
    ) -> Result<AppendSummary, StoreError> {
        let _guard = lock::acquire(&self.write_lock, &self.path)?;

        let mut merged = self.load();
        self.backup(tag)?;

        let mut seen: HashSet<CommandIdentity> = merged.iter().map(Command::identity).collect();
        let mut summary = AppendSummary::default();

        for record in records {
            if record.is_blank() {
                debug!("Skipping record with empty command");
                summary.skipped += 1;
                continue;
            }
            if seen.insert(record.identity()) {
                merged.push(record);
                summary.added += 1;
            } else {
                summary.skipped += 1;
            }
        }

        self.write(&merged)?;
        info!(
            added = summary.added,
            skipped = summary.skipped,
            total = merged.len(),
            %tag,
            "Appended commands"
        );
        Ok(summary)
    }

    /// Quick-add a single record
    pub fn append(&self, record: Command) -> Result<AppendSummary, StoreError> {
        self.append_deduplicated(vec![record], BackupTag::Quick)
    }

    /// Overwrite the store with `records`
    ///
    /// Completeness is the caller's responsibility; see [`SaveGuard`].
    pub fn replace(&self, records: &[Command]) -> Result<(), StoreError> {
        if let Some(index) = records.iter().position(Command::is_blank) {
            return Err(StoreError::EmptyCommand { index });
        }

        let _guard = lock::acquire(&self.write_lock, &self.path)?;
        self.backup(BackupTag::Edit)?;
        self.write(records)?;
        info!(total = records.len(), "Replaced store contents");
        Ok(())
    }

    /// Delete the record at `index`, returning it
    pub fn remove(&self, index: usize) -> Result<Command, StoreError> {
        let _guard = lock::acquire(&self.write_lock, &self.path)?;

        let mut records = self.load();
        if index >= records.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: records.len(),
            });
        }
        let removed = records.remove(index);

        self.backup(BackupTag::Edit)?;
        self.write(&records)?;
        info!(index, total = records.len(), "Removed command");
        Ok(removed)
    }

    /// Atomically replace the store file; caller holds the write lock
    fn write(&self, records: &[Command]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| StoreError::io("create directory", &dir, e))?;

        let mut body = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut body, formatter);
        records.serialize(&mut serializer)?;
        body.push(b'\n');

        let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        let result = write_synced(&tmp, &body).and_then(|_| {
            fs::rename(&tmp, &self.path).map_err(|e| StoreError::io("rename into place", &self.path, e))
        });

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

fn write_synced(path: &Path, body: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::File::create(path).map_err(|e| StoreError::io("create", path, e))?;
    file.write_all(body).map_err(|e| StoreError::io("write", path, e))?;
    file.sync_all().map_err(|e| StoreError::io("sync", path, e))
}
