//! Asset discovery and preload manifests.
//!
//! This module provides:
//! - The [`AssetSource`] seam through which the preload run receives the
//!   build-known asset list
//! - [`ListSource`] for an explicitly injected list
//! - [`DirectorySource`] for walking an image directory on disk
//! - `<link rel="preload">` generation and injection into a built page
//!
//! # Example
//!
//! ```no_run
//! use asset_preload::manifest::{AssetSource, DirectorySource, DiscoveryConfig};
//!
//! let config = DiscoveryConfig {
//!     url_prefix: "/assets/images".to_string(),
//!     skip_hidden: true,
//!     ..Default::default()
//! };
//!
//! let source = DirectorySource::new("site/src/assets/images", config);
//! for id in source.discover().unwrap() {
//!     println!("{id}");
//! }
//! ```

pub mod links;
pub mod walker;

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::AssetId;

pub use links::{inject_preload_links, preload_link, preload_links, PRELOAD_PLACEHOLDER};
pub use walker::DirectorySource;

/// Image extensions discovered by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Default URL prefix under which discovered images are served.
pub const DEFAULT_URL_PREFIX: &str = "/assets/images";

/// The asset list could not be enumerated.
///
/// The preload run treats this as an empty asset set.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The asset root does not exist.
    #[error("Asset root not found: {0}")]
    RootNotFound(PathBuf),

    /// The asset root exists but is not a directory.
    #[error("Asset root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Any other enumeration failure.
    #[error("Asset discovery failed: {0}")]
    Other(String),
}

/// Supplies the identifiers of every build-known asset.
pub trait AssetSource: Send + Sync {
    /// Enumerate the asset set.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] if the set cannot be enumerated.
    fn discover(&self) -> Result<Vec<AssetId>, DiscoveryError>;
}

/// An explicitly injected asset list.
#[derive(Debug, Clone, Default)]
pub struct ListSource(Vec<AssetId>);

impl ListSource {
    #[must_use]
    pub fn new<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AssetId>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }
}

impl AssetSource for ListSource {
    fn discover(&self) -> Result<Vec<AssetId>, DiscoveryError> {
        Ok(self.0.clone())
    }
}

impl<F> AssetSource for F
where
    F: Fn() -> Result<Vec<AssetId>, DiscoveryError> + Send + Sync,
{
    fn discover(&self) -> Result<Vec<AssetId>, DiscoveryError> {
        self()
    }
}

/// Filters and naming for directory discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Skip images larger than this many bytes.
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style), relative to the root.
    pub ignore_patterns: Vec<String>,

    /// File extensions treated as images, compared case-insensitively.
    pub extensions: Vec<String>,

    /// Prefix prepended to each relative path to form its identifier.
    /// Empty means identifiers are plain relative paths.
    pub url_prefix: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            skip_hidden: false,
            max_size: None,
            ignore_patterns: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            url_prefix: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_source_preserves_order() {
        let source = ListSource::new(["b.png", "a.png"]);
        let ids = source.discover().unwrap();
        assert_eq!(ids, vec![AssetId::from("b.png"), AssetId::from("a.png")]);
    }

    #[test]
    fn test_closure_source() {
        let failing = || -> Result<Vec<AssetId>, DiscoveryError> {
            Err(DiscoveryError::Other("glob failed".into()))
        };
        assert!(failing.discover().is_err());
    }

    #[test]
    fn test_default_extensions() {
        let config = DiscoveryConfig::default();
        assert!(config.extensions.iter().any(|e| e == "webp"));
        assert!(config.url_prefix.is_empty());
    }
}
