//! Write serialization for the store file
//!
//! Every mutating store operation holds a [`WriteGuard`] from the initial load
//! until the final rename. Inside one process the guard is a mutex; on Unix it
//! also holds an exclusive `flock` on a sibling `.lock` file so that two
//! processes cannot interleave their backup-then-write sequences.

use std::fs::File;
#[cfg(unix)]
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::StoreError;

pub(crate) struct WriteGuard<'a> {
    _file: Option<FileLock>,
    _process: MutexGuard<'a, ()>,
}

pub(crate) fn acquire<'a>(mutex: &'a Mutex<()>, store_path: &Path) -> Result<WriteGuard<'a>, StoreError> {
    // A panic while writing leaves nothing half-done that the mutex protects.
    let process = mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let file = FileLock::acquire(&lock_path(store_path))?;

    Ok(WriteGuard {
        _file: file,
        _process: process,
    })
}

fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    store_path.with_file_name(name)
}

#[cfg_attr(not(unix), allow(dead_code))]
struct FileLock {
    file: File,
}

impl FileLock {
    #[cfg(unix)]
    fn acquire(path: &Path) -> Result<Option<Self>, StoreError> {
        use std::os::unix::io::AsRawFd;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io("create directory", parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| StoreError::io("open lock file", path, e))?;

        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc != 0 {
            return Err(StoreError::io("lock", path, std::io::Error::last_os_error()));
        }

        Ok(Some(Self { file }))
    }

    // TODO: use LockFileEx so Windows gets the same cross-process exclusion as Unix
    #[cfg(not(unix))]
    fn acquire(_path: &Path) -> Result<Option<Self>, StoreError> {
        Ok(None)
    }
}

#[cfg(unix)]
impl Drop for FileLock {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}
