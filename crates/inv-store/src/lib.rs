//! Filesystem storage for the inventory service.
//!
//! Items are stored as one JSON document per item in a cache directory;
//! photos are opaque blobs in a subdirectory of it. A photo belongs to
//! exactly one item and its lifetime is tied to that item's record.
//!
//! # Stores
//!
//! - [`ItemStore`] -- item records, including create/update/delete with
//!   photo bookkeeping
//! - [`PhotoStore`] -- blob put/replace/delete/resolve
//! - [`QueryView`] -- read-only projections used by the HTTP layer
//!
//! # Design Rules
//!
//! 1. Every file is written to a temp file and renamed into place.
//! 2. Creating a record never overwrites an existing one.
//! 3. Read-modify-write cycles on one item are serialized per id.
//! 4. A photo is written before the record that points at it, and removed
//!    again if that record write fails.
//! 5. Unreadable records are skipped by listings, never fatal to them.

mod atomic;
pub mod config;
pub mod error;
pub mod item;
mod locks;
pub mod photo;
pub mod query;

pub use config::{StoreConfig, DEFAULT_MAX_CREATE_ATTEMPTS, DEFAULT_PHOTOS_DIR};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use item::{ItemStore, ScanReport, SkippedRecord};
pub use locks::{KeyGuard, KeyedLocks};
pub use photo::PhotoStore;
pub use query::QueryView;
