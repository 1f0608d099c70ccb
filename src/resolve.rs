//! Render-time image resolution.
//!
//! An image element first checks the cache synchronously so an already
//! loaded asset paints without a loading flash. On a miss it shows a
//! placeholder while the asset loads, then swaps to the image, or to the
//! caller's fallback asset if the load fails.

use crate::cache::{AssetCache, AssetId, ImageHandle};

/// What an image element should display.
#[derive(Debug, Clone)]
pub enum ImageView {
    /// The image is loaded.
    Ready(ImageHandle),
    /// The image is not cached yet; show a spinner while it loads.
    Loading,
    /// The load failed; display this asset instead.
    Fallback(AssetId),
    /// The load failed and no fallback was given; keep the placeholder.
    Placeholder,
}

impl ImageView {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The loaded image, if any.
    #[must_use]
    pub fn handle(&self) -> Option<&ImageHandle> {
        match self {
            Self::Ready(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Synchronous first paint: `Ready` on a cache hit, otherwise `Loading`.
#[must_use]
pub fn peek(cache: &AssetCache, id: &AssetId) -> ImageView {
    cache
        .get_if_present(id)
        .map_or(ImageView::Loading, ImageView::Ready)
}

/// Settle what to display for `id`, loading it through the cache on a miss.
///
/// Load failures are logged and turned into [`ImageView::Fallback`] when a
/// fallback is supplied, or [`ImageView::Placeholder`] otherwise.
pub async fn resolve(cache: &AssetCache, id: &AssetId, fallback: Option<&AssetId>) -> ImageView {
    if let Some(handle) = cache.get_if_present(id) {
        return ImageView::Ready(handle);
    }

    match cache.ensure_loaded(id).await {
        Ok(handle) => ImageView::Ready(handle),
        Err(e) => {
            log::error!("Image load failed: {}", e);
            match fallback {
                Some(fallback) => ImageView::Fallback(fallback.clone()),
                None => ImageView::Placeholder,
            }
        }
    }
}
