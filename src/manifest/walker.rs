//! Image directory discovery using walkdir.
//!
//! Walks an asset root, keeps files with an image extension, and turns each
//! into an identifier of the form `{url_prefix}/{relative/path}`. Forward
//! slashes are used on every platform so identifiers match served URLs.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use super::{AssetSource, DiscoveryConfig, DiscoveryError};
use crate::cache::AssetId;

/// Discovers image assets below a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    config: DiscoveryConfig,
}

impl DirectorySource {
    /// Create a source for the given root directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: DiscoveryConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    fn is_ignored(&self, entry: &DirEntry, gitignore: Option<&Gitignore>) -> bool {
        if entry.depth() == 0 {
            return false;
        }

        if self.config.skip_hidden
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with('.'))
        {
            return true;
        }

        gitignore.is_some_and(|gi| {
            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            gi.matched(relative, entry.file_type().is_dir()).is_ignore()
        })
    }

    fn has_image_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }

    fn exceeds_max_size(&self, entry: &DirEntry) -> bool {
        let Some(max) = self.config.max_size else {
            return false;
        };

        match entry.metadata() {
            Ok(meta) if meta.len() > max => {
                log::debug!(
                    "Skipping {} ({} bytes > {} byte limit)",
                    entry.path().display(),
                    meta.len(),
                    max
                );
                true
            }
            Ok(_) => false,
            // Size unknown: preload anyway.
            Err(_) => false,
        }
    }

    /// Identifier for a file below the root.
    #[must_use]
    pub fn identifier_for(&self, path: &Path) -> AssetId {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let prefix = self.config.url_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            AssetId::new(joined)
        } else {
            AssetId::new(format!("{prefix}/{joined}"))
        }
    }
}

impl AssetSource for DirectorySource {
    fn discover(&self) -> Result<Vec<AssetId>, DiscoveryError> {
        if !self.root.exists() {
            return Err(DiscoveryError::RootNotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(DiscoveryError::NotADirectory(self.root.clone()));
        }

        let gitignore = self.build_gitignore();
        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry, gitignore.as_ref()));

        let mut ids = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.has_image_extension(entry.path()) {
                continue;
            }
            if self.exceeds_max_size(&entry) {
                continue;
            }

            ids.push(self.identifier_for(entry.path()));
        }

        ids.sort();
        log::debug!(
            "Discovered {} images under {}",
            ids.len(),
            self.root.display()
        );
        Ok(ids)
    }
}
