//! Cache entry definitions.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Opaque identifier of an image asset (a resolved URL or path).
///
/// Two identifiers are equal iff their strings are equal. No normalization
/// is applied, so `/a.png` and `./a.png` are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create an identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty identifier, which is never loadable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for AssetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
struct LoadedImage {
    source: AssetId,
    image: DynamicImage,
}

/// Shared reference to a decoded image.
///
/// Cloning a handle is cheap; all clones point at the same decoded pixels.
#[derive(Debug, Clone)]
pub struct ImageHandle(Arc<LoadedImage>);

impl ImageHandle {
    /// Wrap a decoded image loaded for `source`.
    #[must_use]
    pub fn new(source: AssetId, image: DynamicImage) -> Self {
        Self(Arc::new(LoadedImage { source, image }))
    }

    /// The identifier this image was loaded for.
    #[must_use]
    pub fn source(&self) -> &AssetId {
        &self.0.source
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.image.height()
    }

    /// The decoded image.
    #[must_use]
    pub fn image(&self) -> &DynamicImage {
        &self.0.image
    }

    /// Size of the decoded pixel buffer in bytes.
    #[must_use]
    pub fn decoded_bytes(&self) -> u64 {
        self.0.image.as_bytes().len() as u64
    }

    /// Whether two handles refer to the same loaded image.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Cache segment an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Build-known assets, populated once and never evicted.
    Static,
    /// Assets requested at runtime, clearable in bulk.
    Dynamic,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Point-in-time statistics of the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries in the static partition.
    pub static_entries: usize,
    /// Entries in the dynamic partition.
    pub dynamic_entries: usize,
    /// Whether the one-time static preload has completed.
    pub static_loaded: bool,
    /// Entries across both partitions.
    pub total_entries: usize,
    /// Decoded pixel bytes held across both partitions.
    pub decoded_bytes: u64,
}
