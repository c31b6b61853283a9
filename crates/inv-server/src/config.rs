use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use inv_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Default request body limit, which also caps photo uploads.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding item records and the photo subdirectory.
    pub cache_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Attach a permissive CORS layer, for browser clients on other origins.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            cache_dir: PathBuf::from("cache"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_permissive: false,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub async fn load(path: &Path) -> ServerResult<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            ServerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.cache_dir)
    }
}
