//! Timestamped backup copies of the store file

use chrono::{DateTime, Local};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::StoreError;

/// Origin of a write, recorded in the backup file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupTag {
    /// Bulk import from an external source
    Import,
    /// Single record added from the quick-add surface
    Quick,
    /// Wholesale replacement from an editing surface
    Edit,
}

impl BackupTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupTag::Import => "import",
            BackupTag::Quick => "quick",
            BackupTag::Edit => "edit",
        }
    }
}

impl fmt::Display for BackupTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<tag>_<YYYYMMDD_HHMMSS>.json`
pub fn backup_file_name(tag: BackupTag, at: DateTime<Local>) -> String {
    format!("{}_{}.json", tag, at.format("%Y%m%d_%H%M%S"))
}

/// Copy `source` into `backup_dir`, returning the new file or `None` when
/// there was nothing to back up
///
/// Backups are never pruned. Two backups with the same tag inside one second
/// get a numeric suffix instead of overwriting each other.
pub fn copy_to_backup(
    source: &Path,
    backup_dir: &Path,
    tag: BackupTag,
    at: DateTime<Local>,
) -> Result<Option<PathBuf>, StoreError> {
    if !source.is_file() {
        return Ok(None);
    }

    fs::create_dir_all(backup_dir).map_err(|e| StoreError::io("create directory", backup_dir, e))?;

    let base = backup_file_name(tag, at);
    let mut dest = backup_dir.join(&base);
    let mut n = 1;
    while dest.exists() {
        let stem = base.trim_end_matches(".json");
        dest = backup_dir.join(format!("{}_{}.json", stem, n));
        n += 1;
    }

    fs::copy(source, &dest).map_err(|e| StoreError::io("back up", source, e))?;
    Ok(Some(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
    }

    #[test]
    fn test_backup_file_name_format() {
        assert_eq!(
            backup_file_name(BackupTag::Import, fixed_time()),
            "import_20240309_070501.json"
        );
        assert_eq!(
            backup_file_name(BackupTag::Quick, fixed_time()),
            "quick_20240309_070501.json"
        );
    }

    #[test]
    fn test_missing_source_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let backups = dir.path().join("backups");

        let result = copy_to_backup(
            &dir.path().join("commands.json"),
            &backups,
            BackupTag::Edit,
            fixed_time(),
        )
        .unwrap();

        assert!(result.is_none());
        assert!(!backups.exists());
    }

    #[test]
    fn test_same_second_backups_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("commands.json");
        let backups = dir.path().join("backups");
        fs::write(&source, "[]").unwrap();

        let first = copy_to_backup(&source, &backups, BackupTag::Edit, fixed_time())
            .unwrap()
            .unwrap();
        let second = copy_to_backup(&source, &backups, BackupTag::Edit, fixed_time())
            .unwrap()
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "edit_20240309_070501_1.json"
        );
        assert_eq!(fs::read_to_string(second).unwrap(), "[]");
    }
}
