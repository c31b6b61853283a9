use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest accepted identifier, in bytes.
pub const MAX_ITEM_ID_LEN: usize = 64;

/// Identifier of an inventory item.
///
/// Item ids double as the file stem of the item's record, so the accepted
/// alphabet is narrow: ASCII letters, digits, `-` and `_`.
/// Both UUID strings and the purely numeric ids of older caches parse.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Parse and validate an item id.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidItemId {
            id: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if s.len() > MAX_ITEM_ID_LEN {
            return Err(invalid("too long"));
        }
        if let Some(ch) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(invalid(&format!("contains forbidden character {ch:?}")));
        }
        Ok(Self(s.to_string()))
    }

    /// Build an id from a UUID (hyphenated lowercase form).
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid.hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short representation (first 8 characters).
    pub fn short_id(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl TryFrom<String> for ItemId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ItemId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of identifiers for new items.
///
/// Implementations must never hand out the same id twice, including to
/// callers racing within the same clock tick.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> ItemId;
}

/// Time-ordered generator backed by UUID v7.
///
/// A v7 UUID carries a millisecond timestamp, a per-process monotonic
/// counter and random bits, so ids sort in creation order and stay unique
/// under bursts of concurrent creation.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeOrderedIds;

impl IdGenerator for TimeOrderedIds {
    fn next_id(&self) -> ItemId {
        ItemId::from_uuid(uuid::Uuid::now_v7())
    }
}
