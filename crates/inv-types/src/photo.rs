use std::fmt;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest extension carried over from an uploaded file name.
const MAX_EXTENSION_LEN: usize = 10;

/// Name of a stored photo blob inside the photo directory.
///
/// A `PhotoRef` is always a bare file name. Records are plain files on disk
/// and may be edited by hand, so the reference is re-validated whenever it
/// is deserialised.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhotoRef(String);

impl PhotoRef {
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidPhotoRef {
            name: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if s.contains(['/', '\\', '\0']) {
            return Err(invalid("must be a bare file name"));
        }
        if s.starts_with('.') {
            return Err(invalid("must not start with '.'"));
        }
        if s.contains("..") {
            return Err(invalid("must not contain '..'"));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// MIME type implied by the file extension.
    pub fn content_type(&self) -> &'static str {
        content_type_for(Path::new(&self.0))
    }
}

impl TryFrom<String> for PhotoRef {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhotoRef> for String {
    fn from(r: PhotoRef) -> Self {
        r.0
    }
}

impl fmt::Debug for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhotoRef({})", self.0)
    }
}

impl fmt::Display for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An uploaded photo handed over by the transport layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoUpload {
    /// Raw file contents.
    pub bytes: Bytes,
    /// File name as supplied by the client (used only for its extension).
    pub original_name: String,
    /// Form field the file arrived in; becomes the blob name prefix.
    pub field_tag: String,
}

impl PhotoUpload {
    pub fn new(
        bytes: impl Into<Bytes>,
        original_name: impl Into<String>,
        field_tag: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            original_name: original_name.into(),
            field_tag: field_tag.into(),
        }
    }

    /// Sanitised, lower-cased extension of the original file name.
    ///
    /// Returns `None` when the name has no extension or the extension is not
    /// short ASCII alphanumerics.
    pub fn file_extension(&self) -> Option<String> {
        let ext = Path::new(&self.original_name).extension()?.to_str()?;
        let valid = !ext.is_empty()
            && ext.len() <= MAX_EXTENSION_LEN
            && ext.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then(|| ext.to_ascii_lowercase())
    }

    /// Field tag restricted to characters that are safe in a file name.
    pub fn sanitized_field_tag(&self) -> &str {
        let ok = !self.field_tag.is_empty()
            && self.field_tag.len() <= 32
            && self
                .field_tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if ok {
            &self.field_tag
        } else {
            "photo"
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Content type for a file, derived from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg" | "jpeg" | "jpe" | "jfif") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("tif" | "tiff") => "image/tiff",
        Some("avif") => "image/avif",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
