//! Store file: one JSON document holding the whole snapshot.
//!
//! Writes go to a sibling temp file which is fsynced and renamed over the
//! target, so a concurrent reader sees either the previous document or the
//! new one, never a torn write.

use crate::snapshot::Snapshot;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from reading or writing the store file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotFileError {
    #[error("store file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted store file: {0}")]
    Corrupt(String),
}

/// Read a snapshot from the store file at `path`.
pub fn read_snapshot_from_path(path: impl AsRef<Path>) -> Result<Snapshot, SnapshotFileError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SnapshotFileError::NotFound(path.display().to_string()),
        _ => SnapshotFileError::Io(format!("{}: {e}", path.display())),
    })?;
    validate_file_bytes(path, &bytes)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SnapshotFileError::Parse(format!("{}: {e}", path.display())))
}

/// Atomically replace the store file at `path` with `snapshot`.
pub fn write_snapshot_to_path(
    path: impl AsRef<Path>,
    snapshot: &Snapshot,
) -> Result<(), SnapshotFileError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| SnapshotFileError::Io(format!("{}: {e}", parent.display())))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), SnapshotFileError> {
        let file = File::create(&tmp_path)
            .map_err(|e| SnapshotFileError::Io(format!("{}: {e}", tmp_path.display())))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, snapshot)
            .map_err(|e| SnapshotFileError::Serialize(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| SnapshotFileError::Io(format!("{}: {e}", tmp_path.display())))?;
        let file = writer
            .into_inner()
            .map_err(|e| SnapshotFileError::Io(format!("{}: {e}", tmp_path.display())))?;
        file.sync_all()
            .map_err(|e| SnapshotFileError::Io(format!("{}: {e}", tmp_path.display())))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        SnapshotFileError::Io(format!(
            "{} -> {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent)
            .map_err(|e| SnapshotFileError::Io(format!("{}: {e}", parent.display())))?;
        dir.sync_all()
            .map_err(|e| SnapshotFileError::Io(format!("{}: {e}", parent.display())))?;
    }

    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn validate_file_bytes(path: &Path, bytes: &[u8]) -> Result<(), SnapshotFileError> {
    if bytes.contains(&0) {
        return Err(SnapshotFileError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(SnapshotFileError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}
