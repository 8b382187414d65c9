//! Tests for the command store

use super::*;
use crate::types::Category;
use maplit::hashset;
use std::collections::HashSet;
use tempfile::TempDir;

fn temp_store() -> (TempDir, CommandStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = CommandStore::new(dir.path().join("commands.json"), dir.path().join("backups"));
    (dir, store)
}

fn backups(store: &CommandStore) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(store.backup_dir()) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

fn git(command: &str) -> Command {
    Command::new(command, Category::Cmd).with_software("Git")
}

#[test]
fn test_load_missing_file_is_empty() {
    let (_dir, store) = temp_store();
    assert!(store.load().is_empty());
}

#[test]
fn test_load_corrupt_file_is_empty() {
    let (_dir, store) = temp_store();
    fs::write(store.path(), "{ not json").unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn test_duplicate_within_one_batch() {
    let (_dir, store) = temp_store();

    let summary = store
        .append_deduplicated(vec![git("git status"), git("GIT STATUS  ")], BackupTag::Import)
        .unwrap();

    assert_eq!(summary, AppendSummary { added: 1, skipped: 1 });
    assert_eq!(store.load().len(), 1);
}

#[test]
fn test_repeat_import_is_idempotent() {
    let (_dir, store) = temp_store();
    store
        .append_deduplicated(vec![git("git status"), git("git log")], BackupTag::Import)
        .unwrap();

    let again = store
        .append_deduplicated(vec![git(" Git Status ")], BackupTag::Import)
        .unwrap();

    assert_eq!(again, AppendSummary { added: 0, skipped: 1 });
    assert_eq!(store.load().len(), 2);
}

#[test]
fn test_same_command_under_other_software_is_distinct() {
    let (_dir, store) = temp_store();
    let summary = store
        .append_deduplicated(
            vec![git("clear"), Command::new("clear", Category::Cmd).with_software("Terminal")],
            BackupTag::Import,
        )
        .unwrap();

    assert_eq!(summary.added, 2);
}

#[test]
fn test_blank_commands_are_skipped_on_append() {
    let (_dir, store) = temp_store();
    let summary = store
        .append_deduplicated(vec![git("   "), git("git pull")], BackupTag::Import)
        .unwrap();

    assert_eq!(summary, AppendSummary { added: 1, skipped: 1 });
    assert_eq!(store.load()[0].command, "git pull");
}

#[test]
fn test_first_write_makes_no_backup_then_later_writes_do() {
    let (_dir, store) = temp_store();

    store.append(git("git status")).unwrap();
    assert!(backups(&store).is_empty());

    store.append(git("git log")).unwrap();
    let names = backups(&store);
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("quick_"));
    assert!(names[0].ends_with(".json"));
}

#[test]
fn test_backup_holds_prior_state() {
    let (_dir, store) = temp_store();
    store.append(git("git status")).unwrap();

    store.replace(&[git("git log")]).unwrap();

    let backup = store.backup_dir().join(&backups(&store)[0]);
    let previous: Vec<Command> = serde_json::from_str(&fs::read_to_string(backup).unwrap()).unwrap();
    assert_eq!(previous, vec![git("git status")]);
    assert_eq!(store.load(), vec![git("git log")]);
}

#[test]
fn test_replace_rejects_blank_command_before_writing() {
    let (_dir, store) = temp_store();
    store.append(git("git status")).unwrap();

    let err = store.replace(&[git("git log"), git(" ")]).unwrap_err();

    assert!(matches!(err, StoreError::EmptyCommand { index: 1 }));
    assert_eq!(store.load(), vec![git("git status")]);
    assert!(backups(&store).is_empty());
}

#[test]
fn test_remove_returns_record_and_backs_up() {
    let (_dir, store) = temp_store();
    store
        .append_deduplicated(vec![git("a"), git("b"), git("c")], BackupTag::Import)
        .unwrap();

    let removed = store.remove(1).unwrap();

    assert_eq!(removed.command, "b");
    let remaining: Vec<String> = store.load().into_iter().map(|c| c.command).collect();
    assert_eq!(remaining, vec!["a", "c"]);
    assert!(backups(&store).iter().any(|n| n.starts_with("edit_")));
}

#[test]
fn test_remove_out_of_range() {
    let (_dir, store) = temp_store();
    store.append(git("a")).unwrap();

    let err = store.remove(5).unwrap_err();
    assert!(matches!(err, StoreError::IndexOutOfRange { index: 5, len: 1 }));
}

#[test]
fn test_file_is_pretty_printed_with_four_spaces() {
    let (_dir, store) = temp_store();
    store.append(git("git status")).unwrap();

    let raw = fs::read_to_string(store.path()).unwrap();
    assert!(raw.starts_with("[\n    {\n        \"command\": \"git status\""));
    assert!(raw.ends_with("]\n"));
}

#[test]
fn test_write_leaves_no_temporary_files() {
    let (dir, store) = temp_store();
    store.append(git("git status")).unwrap();
    store.append(git("git log")).unwrap();

    let names: HashSet<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| !n.ends_with(".lock"))
        .collect();

    assert_eq!(names, hashset! {"commands.json".to_string(), "backups".to_string()});
}

#[test]
fn test_unknown_category_survives_rewrite() {
    let (_dir, store) = temp_store();
    fs::write(
        store.path(),
        r#"[{"command": "hello", "category": "Macro", "software": "Notepad", "tags": ["x"]}]"#,
    )
    .unwrap();

    store.append(git("git status")).unwrap();

    let records = store.load();
    assert_eq!(records[0].category, Category::Other("Macro".to_string()));
    assert_eq!(records[0].description, "");
}

#[test]
fn test_save_guard() {
    assert!(SaveGuard::check(3, 3).is_ok());
    assert!(matches!(
        SaveGuard::check(2, 3),
        Err(StoreError::PartialView { visible: 2, total: 3 })
    ));
}

#[test]
fn test_concurrent_appends_are_serialized() {
    let (_dir, store) = temp_store();
    let store = std::sync::Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            std::thread::spawn(move || store.append(git(&format!("cmd {}", i))).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.load().len(), 8);
}

#[test]
fn test_backup_failure_is_returned_and_store_untouched() {
    let (_dir, store) = temp_store();
    store.append(git("a")).unwrap();
    fs::write(store.backup_dir(), "not a directory").unwrap();

    let err = store.append(git("b")).unwrap_err();
    assert!(matches!(err, StoreError::Io { ref action, .. } if action == "create directory"));

    let err = store.replace(&[git("c")]).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));

    let commands: Vec<String> = store.load().into_iter().map(|c| c.command).collect();
    assert_eq!(commands, vec!["a"]);
}

#[test]
fn test_failed_rename_is_returned_and_temp_file_removed() {
    let dir = tempfile::tempdir().unwrap();
    // A non-empty directory where the store file should be cannot be renamed over.
    let blocked = dir.path().join("commands.json");
    fs::create_dir(&blocked).unwrap();
    fs::write(blocked.join("keep"), "x").unwrap();
    let store = CommandStore::new(&blocked, dir.path().join("backups"));

    let err = store.write(&[git("a")]).unwrap_err();
    assert!(matches!(err, StoreError::Io { ref action, .. } if action == "rename into place"));

    let leftovers: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    assert!(blocked.join("keep").exists());
}
