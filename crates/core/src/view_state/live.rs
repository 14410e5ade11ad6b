use log::debug;
use tokio::task::JoinHandle;

use crate::events::ChangeFeed;

/// Handle to a background task that keeps a view state in sync with the
/// change feed. The task stops when the handle is dropped or cancelled.
#[must_use = "live updates stop as soon as the handle is dropped"]
pub struct LiveUpdates {
    handle: JoinHandle<()>,
}

impl LiveUpdates {
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for LiveUpdates {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Runs `refresh` once immediately and again after every committed change.
///
/// Must be called from within a tokio runtime.
pub(crate) fn spawn_refresh_loop<F>(name: &'static str, feed: &ChangeFeed, refresh: F) -> LiveUpdates
where
    F: Fn() + Send + 'static,
{
    // Subscribe before the first load so no commit can slip in between.
    let mut subscription = feed.subscribe();
    let handle = tokio::spawn(async move {
        refresh();
        while subscription.changed().await {
            debug!("{}: change detected, reloading", name);
            refresh();
        }
        debug!("{}: change feed closed, stopping live updates", name);
    });
    LiveUpdates { handle }
}
