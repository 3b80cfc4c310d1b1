//! Artifact value records and size rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A platform tag from the versioned mapping table.
///
/// The tag set evolves across releases (new tags are added, none are
/// silently removed), so this is an open newtype over the table in
/// [`crate::platform`], not a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Platform(String);

impl Platform {
    /// Creates a platform tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Platform {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// One classified object-store entry of interest.
///
/// Immutable value record derived from a listing snapshot; no component
/// mutates a previously classified artifact's path or size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique object key.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Mapped platform tag; `None` means "irrelevant, ignore".
    pub platform: Option<Platform>,
    /// Semantic version triple string.
    pub version: String,
    /// 10-digit epoch-seconds revision; `None` only for the pinned
    /// production release until the configured revision is stamped on.
    pub revision: Option<String>,
    /// Optional hex content digest from a checksum sidecar.
    pub checksum: Option<String>,
}

/// Renders a byte count as a coarse human-readable magnitude.
///
/// Matches the historical manifest format consumed by installers:
/// integer division through KB/MB/GB bands, and the raw KiB count with
/// no unit above the GB band.
#[must_use]
pub fn pretty_size(bytes: u64) -> String {
    let kib = bytes / 1024;

    if kib < 1024 {
        format!("{kib} KB")
    } else if kib / 1024 < 1024 {
        format!("{} MB", kib / 1024)
    } else if kib / 1024 / 1024 < 1024 {
        format!("{} GB", kib / 1024 / 1024)
    } else {
        kib.to_string()
    }
}
