use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default name of the photo subdirectory inside the cache directory.
pub const DEFAULT_PHOTOS_DIR: &str = "photos";
/// Extension of record files.
pub const RECORD_EXTENSION: &str = "json";
/// How many fresh ids `create` tries before giving up.
pub const DEFAULT_MAX_CREATE_ATTEMPTS: usize = 8;

/// Store configuration, resolved at startup and passed into the stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Cache directory holding one record file per item.
    pub root: PathBuf,
    /// Name of the photo subdirectory under `root`.
    #[serde(default = "default_photos_dir")]
    pub photos_dir_name: String,
    #[serde(default = "default_max_create_attempts")]
    pub max_create_attempts: usize,
}

fn default_photos_dir() -> String {
    DEFAULT_PHOTOS_DIR.to_string()
}

fn default_max_create_attempts() -> usize {
    DEFAULT_MAX_CREATE_ATTEMPTS
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            photos_dir_name: default_photos_dir(),
            max_create_attempts: DEFAULT_MAX_CREATE_ATTEMPTS,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the item records (the cache directory itself).
    pub fn records_dir(&self) -> &Path {
        &self.root
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.root.join(&self.photos_dir_name)
    }
}
