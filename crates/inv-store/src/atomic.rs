//! Whole-file writes that readers never observe half-done.
//!
//! Content is written to a temporary file in the destination directory and
//! then moved into place, so a concurrent reader sees either the previous
//! file or the new one.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// What to do when the destination already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Atomically replace the existing file.
    Replace,
    /// Fail with `ErrorKind::AlreadyExists` instead of touching it.
    CreateNew,
}

/// Write `data` to `target`, going through a temp file beside it.
pub async fn write_file(target: &Path, data: Vec<u8>, mode: WriteMode) -> io::Result<()> {
    let target = target.to_path_buf();
    tokio::task::spawn_blocking(move || write_file_blocking(&target, &data, mode))
        .await
        .map_err(io::Error::other)?
}

fn write_file_blocking(target: &Path, data: &[u8], mode: WriteMode) -> io::Result<()> {
    let dir = parent_dir(target);
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    match mode {
        WriteMode::Replace => tmp.persist(target).map(|_| ()).map_err(|e| e.error),
        WriteMode::CreateNew => tmp.persist_noclobber(target).map(|_| ()).map_err(|e| e.error),
    }
}

fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Remove a file, reporting whether it existed.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
