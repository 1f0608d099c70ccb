//! Terminal progress display for the preload run, using indicatif.
//!
//! [`PreloadProgress`] turns coordinator snapshots into a progress bar. Feed
//! it from a subscription:
//!
//! ```no_run
//! use asset_preload::preload::PreloadCoordinator;
//! use asset_preload::progress::PreloadProgress;
//!
//! # fn demo(coordinator: &PreloadCoordinator) {
//! let progress = PreloadProgress::new(false, false);
//! let subscription = coordinator.subscribe(progress.listener());
//! # let _ = subscription;
//! # }
//! ```
//!
//! # Plain Mode
//!
//! With plain mode (used with `--no-color`) the bar is drawn with ASCII
//! characters and no color.

use indicatif::{ProgressBar, ProgressStyle};

use crate::preload::PreloadState;

/// Progress bar driven by preload snapshots.
#[derive(Debug, Clone)]
pub struct PreloadProgress {
    bar: ProgressBar,
}

impl PreloadProgress {
    /// Create a progress display.
    ///
    /// # Arguments
    ///
    /// * `hidden` - Draw nothing (quiet mode or non-interactive output)
    /// * `plain` - ASCII bar without color
    #[must_use]
    pub fn new(hidden: bool, plain: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        bar.set_style(Self::style(plain));
        bar.set_message("Discovering images");
        Self { bar }
    }

    fn style(plain: bool) -> ProgressStyle {
        if plain {
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
        } else {
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
        }
    }

    /// Apply one snapshot.
    pub fn update(&self, state: &PreloadState) {
        if self.bar.is_finished() {
            return;
        }

        let total = state.total as u64;
        if self.bar.length() != Some(total) {
            self.bar.set_length(total);
        }
        self.bar.set_position(state.attempted() as u64);

        if state.done {
            self.bar.finish_with_message(Self::summary(state));
        } else if state.failed > 0 {
            self.bar
                .set_message(format!("Preloading images ({} failed)", state.failed));
        } else if state.started {
            self.bar.set_message("Preloading images");
        }
    }

    fn summary(state: &PreloadState) -> String {
        if state.failed == 0 {
            format!("Preloaded {} images", state.loaded)
        } else {
            format!(
                "Preloaded {} images, {} failed",
                state.loaded, state.failed
            )
        }
    }

    /// A coordinator listener that forwards snapshots to this display.
    #[must_use]
    pub fn listener(&self) -> impl Fn(PreloadState) + Send + Sync + 'static {
        let progress = self.clone();
        move |state| progress.update(&state)
    }

    /// Current bar position (assets attempted).
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}
