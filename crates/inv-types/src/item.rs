use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::id::ItemId;
use crate::photo::PhotoRef;

/// Wire/disk key of the item name.
pub const NAME_FIELD: &str = "inventory_name";
/// Wire/disk key of the item description.
pub const DESCRIPTION_FIELD: &str = "description";

/// URL under which an item's photo is served.
pub fn photo_url_for(id: &ItemId) -> String {
    format!("/inventory/{id}/photo")
}

/// A persisted inventory record.
///
/// The photo URL is not a field: it is derived from the id whenever a photo
/// reference is present, which keeps the two in lockstep.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ItemDocument", from = "ItemDocument")]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub photo_ref: Option<PhotoRef>,
}

impl InventoryItem {
    pub fn new(id: ItemId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            photo_ref: None,
        }
    }

    pub fn with_photo(mut self, photo: PhotoRef) -> Self {
        self.photo_ref = Some(photo);
        self
    }

    /// Public URL of the photo, present iff the item references one.
    pub fn photo_url(&self) -> Option<String> {
        self.photo_ref.as_ref().map(|_| photo_url_for(&self.id))
    }

    pub fn has_photo(&self) -> bool {
        self.photo_ref.is_some()
    }

    /// Apply the recognised fields of a patch. Returns `true` if anything changed.
    pub fn apply(&mut self, patch: &ItemPatch) -> bool {
        let mut changed = false;
        if let Some(name) = &patch.name {
            changed |= self.name != *name;
            self.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            changed |= self.description != *description;
            self.description.clone_from(description);
        }
        changed
    }
}

/// Serialised shape of an item, shared by the record files and the API.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ItemDocument {
    #[serde(rename = "ID")]
    id: ItemId,
    inventory_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    photo_path: Option<PhotoRef>,
    #[serde(default)]
    photo_url: Option<String>,
}

impl From<InventoryItem> for ItemDocument {
    fn from(item: InventoryItem) -> Self {
        let photo_url = item.photo_url();
        Self {
            id: item.id,
            inventory_name: item.name,
            description: item.description,
            photo_path: item.photo_ref,
            photo_url,
        }
    }
}

impl From<ItemDocument> for InventoryItem {
    // A stored photo_url is ignored; it is recomputed from the id.
    fn from(doc: ItemDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.inventory_name,
            description: doc.description,
            photo_ref: doc.photo_path,
        }
    }
}

/// Fields supplied when registering a new item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewItem {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl NewItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The name, if present and not blank.
    pub fn valid_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// A partial update to an item.
///
/// Besides the recognised mutable fields, a patch remembers which other keys
/// the caller sent: a body of only unknown keys is a no-op, while a body with
/// no keys at all is rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unrecognized: BTreeSet<String>,
}

impl ItemPatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unrecognized(mut self, key: impl Into<String>) -> Self {
        self.unrecognized.insert(key.into());
        self
    }

    /// Build a patch from a decoded JSON object.
    pub fn from_json_object(object: &Map<String, Value>) -> Result<Self, TypeError> {
        let mut patch = Self::default();
        for (key, value) in object {
            match key.as_str() {
                NAME_FIELD => patch.name = Some(string_field(key, value)?),
                DESCRIPTION_FIELD => patch.description = Some(string_field(key, value)?),
                _ => {
                    patch.unrecognized.insert(key.clone());
                }
            }
        }
        Ok(patch)
    }

    /// No keys were supplied at all.
    pub fn is_empty(&self) -> bool {
        !self.has_changes() && self.unrecognized.is_empty()
    }

    /// At least one recognised field was supplied.
    pub fn has_changes(&self) -> bool {
        self.name.is_some() || self.description.is_some()
    }
}

fn string_field(key: &str, value: &Value) -> Result<String, TypeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(TypeError::InvalidField {
            field: key.to_string(),
            reason: format!("expected a string, got {other}"),
        }),
    }
}

/// Externally visible projection of an item, without internal fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    #[serde(rename = "ID")]
    pub id: ItemId,
    #[serde(rename = "inventory_name")]
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl ItemView {
    /// Project an item; the photo URL survives only when requested and present.
    pub fn project(item: &InventoryItem, include_photo: bool) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            photo_url: if include_photo { item.photo_url() } else { None },
        }
    }
}
