//! Asset loading: the fetch and decode step behind the cache.
//!
//! The cache never touches the filesystem itself. It calls an
//! [`AssetLoader`], which turns an identifier into a decoded [`ImageHandle`]
//! or a [`LoadFailure`]. [`FsImageLoader`] is the implementation used by the
//! CLI; tests and embedders inject their own.
//!
//! # Example
//!
//! ```no_run
//! use asset_preload::cache::AssetId;
//! use asset_preload::loader::{AssetLoader, FsImageLoader};
//!
//! # async fn demo() {
//! let loader = FsImageLoader::new("site/assets/images").with_url_prefix("/assets/images");
//! match loader.load(&AssetId::from("/assets/images/hero.png")).await {
//!     Ok(handle) => println!("{}x{}", handle.width(), handle.height()),
//!     Err(e) => eprintln!("{e}"),
//! }
//! # }
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::cache::{AssetId, FailureReason, ImageHandle, LoadFailure};

/// Fetches and decodes a single asset.
///
/// Implementations must settle every call (success or failure); a load that
/// never settles keeps the preload run from ever reaching Done.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Load the asset named by `id`.
    async fn load(&self, id: &AssetId) -> Result<ImageHandle, LoadFailure>;
}

/// Loads images from a directory on disk.
///
/// Identifiers that start with the configured URL prefix are mapped under the
/// asset root, relative identifiers are joined onto the root, and absolute
/// paths are read as-is.
#[derive(Debug, Clone)]
pub struct FsImageLoader {
    root: PathBuf,
    url_prefix: String,
}

impl FsImageLoader {
    /// Create a loader rooted at `root` with no URL prefix.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            url_prefix: String::new(),
        }
    }

    /// Set the URL prefix that maps onto the asset root.
    #[must_use]
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an identifier to the file it names.
    #[must_use]
    pub fn resolve_path(&self, id: &AssetId) -> PathBuf {
        let raw = id.as_str();

        if !self.url_prefix.is_empty() {
            if let Some(rest) = raw.strip_prefix(self.url_prefix.as_str()) {
                if rest.is_empty() || rest.starts_with('/') {
                    return self.root.join(rest.trim_start_matches('/'));
                }
            }
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl AssetLoader for FsImageLoader {
    async fn load(&self, id: &AssetId) -> Result<ImageHandle, LoadFailure> {
        let path = self.resolve_path(id);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LoadFailure::new(id.clone(), FailureReason::NotFound));
            }
            Err(e) => {
                return Err(LoadFailure::new(id.clone(), FailureReason::Io(e.to_string())));
            }
        };

        // Decoding is CPU bound; keep it off the async workers.
        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| LoadFailure::other(id.clone(), format!("decode task failed: {e}")))?
            .map_err(|e| LoadFailure::new(id.clone(), FailureReason::Decode(e.to_string())))?;

        log::debug!(
            "Decoded {} ({}x{}) from {}",
            id,
            decoded.width(),
            decoded.height(),
            path.display()
        );

        Ok(ImageHandle::new(id.clone(), decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_resolve_path_with_prefix() {
        let loader = FsImageLoader::new("/srv/site/images").with_url_prefix("/assets/images/");
        assert_eq!(
            loader.resolve_path(&"/assets/images/team/a.png".into()),
            PathBuf::from("/srv/site/images/team/a.png")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_path_prefix_must_end_at_segment() {
        let loader = FsImageLoader::new("/srv/img").with_url_prefix("/assets");
        // "/assetsX/..." is not under "/assets"
        assert_eq!(
            loader.resolve_path(&"/assetsX/a.png".into()),
            PathBuf::from("/assetsX/a.png")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_relative_and_absolute() {
        let loader = FsImageLoader::new("/srv/img");
        assert_eq!(
            loader.resolve_path(&"logo.png".into()),
            PathBuf::from("/srv/img/logo.png")
        );
        assert_eq!(
            loader.resolve_path(&"/tmp/x.png".into()),
            PathBuf::from("/tmp/x.png")
        );
    }
}
