use inv_types::{ItemId, PhotoRef, TypeError};

/// Coarse classification of a store failure, for transport translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or empty required input.
    Validation,
    /// No record, no blob, or a dangling reference.
    NotFound,
    /// The record exists but cannot be parsed.
    CorruptRecord,
    /// I/O failure while reading, writing or deleting.
    Storage,
}

/// Errors from item and photo store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Required input is missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No record exists for the id.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// The referenced photo blob does not exist.
    #[error("photo not found: {0}")]
    PhotoNotFound(PhotoRef),

    /// The item exists but has no photo attached.
    #[error("item {0} has no photo")]
    NoPhoto(ItemId),

    /// The record file exists but does not decode to a valid item.
    #[error("corrupt record {id}: {reason}")]
    CorruptRecord { id: ItemId, reason: String },

    /// Every generated id collided with an existing record.
    #[error("could not allocate a free item id after {attempts} attempts")]
    IdSpaceExhausted { attempts: usize },

    /// Serialization failure while encoding a record.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::ItemNotFound(_) | Self::PhotoNotFound(_) | Self::NoPhoto(_) => {
                ErrorKind::NotFound
            }
            Self::CorruptRecord { .. } => ErrorKind::CorruptRecord,
            Self::IdSpaceExhausted { .. } | Self::Serialization(_) | Self::Io(_) => {
                ErrorKind::Storage
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_taxonomy() {
        let id = ItemId::parse("1").unwrap();
        let photo = PhotoRef::parse("photo-1-2.png").unwrap();

        assert_eq!(StoreError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(StoreError::ItemNotFound(id.clone()).kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::PhotoNotFound(photo).kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::NoPhoto(id.clone()).kind(), ErrorKind::NotFound);
        assert_eq!(
            StoreError::CorruptRecord { id, reason: "bad".into() }.kind(),
            ErrorKind::CorruptRecord
        );
        assert_eq!(
            StoreError::Io(std::io::Error::other("disk")).kind(),
            ErrorKind::Storage
        );
        assert_eq!(StoreError::IdSpaceExhausted { attempts: 3 }.kind(), ErrorKind::Storage);
    }

    #[test]
    fn type_errors_become_validation() {
        let err: StoreError = ItemId::parse("").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
