//! Startup preload of the build-known asset set.
//!
//! The [`PreloadCoordinator`] is a single-run state machine:
//!
//! - **Idle**: nothing started, all counters zero.
//! - **Running**: entered by [`PreloadCoordinator::start`]. The asset list is
//!   enumerated and its size published as `total`; a fixed-width worker pool
//!   then loads every asset through the [`AssetCache`](crate::cache::AssetCache),
//!   publishing after each settlement.
//! - **Done**: every asset has been attempted (`loaded + failed == total`), or
//!   nothing was discovered. Terminal.
//!
//! Individual failures are counted, never propagated: a broken asset cannot
//! hold the loading screen up.

pub mod coordinator;
pub mod state;

pub use coordinator::{Listener, PreloadConfig, PreloadCoordinator, PreloadRun, Subscription};
pub use state::PreloadState;
