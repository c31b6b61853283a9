//! HTTP server for the inventory service.
//!
//! Exposes item registration, listing, partial updates, photo upload and
//! download, and a small search endpoint over an [`inv_store::ItemStore`].
//! Failures are answered as JSON `{"message": ...}` with a status derived
//! from the store's error kind.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ServerConfig, DEFAULT_MAX_UPLOAD_BYTES};
pub use error::{ServerError, ServerResult};
pub use server::InventoryServer;
pub use state::AppState;
