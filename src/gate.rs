//! Loading-screen gate over the preload progress feed.
//!
//! A page shows a blocking overlay while the preload run is in progress and
//! releases it once every asset has been attempted. [`LoadingGate`] packages
//! that contract: attaching subscribes to the coordinator and starts the run,
//! the latest snapshot is kept in a watch channel, and dropping the gate
//! unsubscribes.

use tokio::sync::watch;

use crate::preload::{PreloadCoordinator, PreloadRun, PreloadState, Subscription};

/// Tracks whether the loading screen may be released.
pub struct LoadingGate {
    receiver: watch::Receiver<PreloadState>,
    subscription: Subscription,
    run: PreloadRun,
}

impl std::fmt::Debug for LoadingGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingGate")
            .field("state", &self.state())
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl LoadingGate {
    /// Subscribe to `coordinator` and start its run (idempotent).
    ///
    /// # Panics
    ///
    /// Panics if the run has not been started yet and no Tokio runtime is
    /// available.
    #[must_use]
    pub fn attach(coordinator: &PreloadCoordinator) -> Self {
        let (sender, receiver) = watch::channel(coordinator.state());
        let subscription = coordinator.subscribe(move |state| {
            sender.send_replace(state);
        });
        let run = coordinator.start();

        Self {
            receiver,
            subscription,
            run,
        }
    }

    /// Latest snapshot seen by the gate.
    #[must_use]
    pub fn state(&self) -> PreloadState {
        *self.receiver.borrow()
    }

    /// Whether the overlay can be released.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state().done
    }

    /// Wait until every asset has been attempted.
    ///
    /// Also returns once the run itself settles, so an aborted run hands
    /// back its last snapshot instead of blocking forever.
    pub async fn wait_ready(&self) -> PreloadState {
        let mut receiver = self.receiver.clone();
        let ready = tokio::select! {
            ready = receiver.wait_for(|state| state.done) => ready.map(|state| *state).ok(),
            finished = self.run.clone() => Some(finished),
        };
        match ready {
            Some(state) => state,
            None => self.run.clone().await,
        }
    }
}

impl Drop for LoadingGate {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
