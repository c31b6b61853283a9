use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid item id {id:?}: {reason}")]
    InvalidItemId { id: String, reason: String },

    #[error("invalid photo reference {name:?}: {reason}")]
    InvalidPhotoRef { name: String, reason: String },

    #[error("invalid value for field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}
