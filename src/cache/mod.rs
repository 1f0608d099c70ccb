//! Image caching module.
//!
//! This module memoizes decoded images so a page element can paint instantly
//! when its asset was already loaded, and so repeated requests never fetch
//! the same asset twice.
//!
//! # Architecture
//!
//! * [`store`]: the [`AssetCache`] itself, with its two partitions.
//! * [`entry`]: identifiers, image handles and statistics.
//! * [`error`]: the [`LoadFailure`] reported for a single asset.
//!
//! # Partitions
//!
//! * **Static**: assets known at build time, filled once by the startup
//!   preload and never evicted.
//! * **Dynamic**: assets requested at runtime through
//!   [`AssetCache::ensure_loaded`], clearable in bulk.
//!
//! Lookups check the static partition first. Failed loads are never cached.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{AssetId, CacheStats, ImageHandle, Partition};
pub use error::{FailureReason, LoadFailure};
pub use store::AssetCache;
