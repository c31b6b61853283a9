//! Photo blob storage.
//!
//! Blobs live in their own subdirectory of the cache and are named
//! `<field>-<unix millis>-<random>.<ext>`, independent of the owning item's
//! id. The directory is created on the first write.

use std::io;
use std::path::{Path, PathBuf};

use inv_types::{PhotoRef, PhotoUpload};
use rand::Rng;
use tracing::{debug, warn};

use crate::atomic::{self, WriteMode};
use crate::error::{StoreError, StoreResult};

/// Attempts at finding an unused blob name before giving up.
const MAX_NAME_ATTEMPTS: usize = 4;

/// Owns the photo directory.
#[derive(Clone, Debug)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, photo: &PhotoRef) -> PathBuf {
        self.dir.join(photo.as_str())
    }

    /// Store an upload under a freshly generated name.
    pub async fn put(&self, upload: &PhotoUpload) -> StoreResult<PhotoRef> {
        tokio::fs::create_dir_all(&self.dir).await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let photo = generate_name(upload)?;
            let path = self.path_of(&photo);
            match atomic::write_file(&path, upload.bytes.to_vec(), WriteMode::CreateNew).await {
                Ok(()) => {
                    debug!(photo = %photo, bytes = upload.len(), "stored photo");
                    return Ok(photo);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(photo = %photo, "photo name collision; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not find an unused photo name",
        )))
    }

    /// Store a new blob, then drop the old one if there was one.
    ///
    /// A failed write leaves `old` untouched. A missing old blob is not an
    /// error; any other failure removing it is logged and the new reference
    /// is still returned.
    pub async fn replace(
        &self,
        old: Option<&PhotoRef>,
        upload: &PhotoUpload,
    ) -> StoreResult<PhotoRef> {
        let new = self.put(upload).await?;
        if let Some(old) = old {
            if let Err(e) = self.delete(old).await {
                warn!(photo = %old, error = %e, "failed to delete replaced photo");
            }
        }
        Ok(new)
    }

    /// Delete a blob. Returns `true` if it existed.
    pub async fn delete(&self, photo: &PhotoRef) -> StoreResult<bool> {
        let existed = atomic::remove_if_exists(&self.path_of(photo)).await?;
        debug!(photo = %photo, existed, "deleted photo");
        Ok(existed)
    }

    /// Path of an existing blob, or `PhotoNotFound`.
    pub async fn resolve(&self, photo: &PhotoRef) -> StoreResult<PathBuf> {
        let path = self.path_of(photo);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(StoreError::PhotoNotFound(photo.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::PhotoNotFound(photo.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read a blob's bytes.
    pub async fn read(&self, photo: &PhotoRef) -> StoreResult<Vec<u8>> {
        let path = self.resolve(photo).await?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            // Deleted between resolve and read.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::PhotoNotFound(photo.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn generate_name(upload: &PhotoUpload) -> StoreResult<PhotoRef> {
    let millis = chrono::Utc::now().timestamp_millis();
    let random: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let stem = format!("{}-{millis}-{random}", upload.sanitized_field_tag());
    let name = match upload.file_extension() {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    };
    Ok(PhotoRef::parse(&name)?)
}
