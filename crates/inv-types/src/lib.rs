//! Foundation types for the inventory service.
//!
//! This crate provides the identifiers and record shapes shared by the store
//! and the HTTP layer. It performs no I/O.
//!
//! # Key Types
//!
//! - [`ItemId`]: validated item identifier, also the record's file stem
//! - [`IdGenerator`] / [`TimeOrderedIds`]: unique id allocation (UUID v7)
//! - [`InventoryItem`]: the persisted record, with a derived photo URL
//! - [`NewItem`] / [`ItemPatch`]: creation fields and partial updates
//! - [`PhotoRef`] / [`PhotoUpload`]: stored blob names and incoming uploads
//! - [`ItemView`]: projection with internal fields removed

pub mod error;
pub mod id;
pub mod item;
pub mod photo;

pub use error::TypeError;
pub use id::{IdGenerator, ItemId, TimeOrderedIds, MAX_ITEM_ID_LEN};
pub use item::{
    photo_url_for, InventoryItem, ItemPatch, ItemView, NewItem, DESCRIPTION_FIELD, NAME_FIELD,
};
pub use photo::{content_type_for, PhotoRef, PhotoUpload};
