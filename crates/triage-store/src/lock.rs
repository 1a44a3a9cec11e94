//! Single-writer lock for a store path.
//!
//! A running [`CategoryStore`](crate::CategoryStore) holds an exclusive
//! advisory lock on `<store>.lock` for its whole lifetime, so a second writer
//! process on the same file fails fast instead of overwriting the first one's
//! additions. The kernel drops the lock when the holder exits, however it
//! exits; a lock file left behind by a killed process is simply re-locked.
//!
//! The file itself is never removed: unlinking a path another process may
//! have just opened would let two writers lock different inodes.

use chrono::Utc;
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub fn store_lock_path(store_path: &Path) -> PathBuf {
    let mut path: OsString = store_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("store lock busy: {lock_path} (another writer is running{holder})")]
    Busy { lock_path: String, holder: String },

    #[error("failed to acquire store lock {lock_path}: {message}")]
    Io { lock_path: String, message: String },
}

/// Held writer lock; released when dropped or when the process dies.
#[derive(Debug)]
pub struct WriterLock {
    lock_path: PathBuf,
    file: File,
}

impl WriterLock {
    pub fn acquire(store_path: &Path) -> Result<Self, LockError> {
        let lock_path = store_lock_path(store_path);
        let display = lock_path.display().to_string();
        let io_err = |e: std::io::Error| LockError::Io {
            lock_path: display.clone(),
            message: e.to_string(),
        };

        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(io_err)?;

        if let Err(err) = file.try_lock_exclusive() {
            if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                let holder = fs::read_to_string(&lock_path)
                    .ok()
                    .and_then(|content| {
                        content
                            .lines()
                            .find(|line| line.starts_with("pid="))
                            .map(|line| format!(", {line}"))
                    })
                    .unwrap_or_default();
                return Err(LockError::Busy {
                    lock_path: display.clone(),
                    holder,
                });
            }
            return Err(io_err(err));
        }

        // Stale content from a previous holder is replaced.
        file.set_len(0).map_err(io_err)?;
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        writeln!(
            file,
            "pid={}\nutc={}",
            std::process::id(),
            Utc::now().to_rfc3339()
        )
        .map_err(io_err)?;

        Ok(Self { lock_path, file })
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = FileExt::unlock(&self.file);
    }
}
