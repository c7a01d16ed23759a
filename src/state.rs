//! The session's published snapshot of shops.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::SessionError;
use crate::shop::Shop;
use crate::ui::UiHandle;

/// Holds the shops currently shown to the user.
///
/// The snapshot is an immutable `Arc<[Shop]>` that is only ever replaced
/// wholesale through [`publish`](PublishedState::publish), never edited in
/// place. Replacing it is what drives the UI: every publish dispatches the
/// new count to the UI lane.
///
/// `Clone` is cheap; clones share the same snapshot.
#[derive(Debug, Clone)]
pub struct PublishedState {
    snapshot: Arc<watch::Sender<Arc<[Shop]>>>,
    ui: UiHandle,
}

impl PublishedState {
    /// Create an empty state that reports to `ui`.
    pub(crate) fn new(ui: UiHandle) -> Self {
        let (tx, _rx) = watch::channel(Arc::from(Vec::<Shop>::new()));
        Self {
            snapshot: Arc::new(tx),
            ui,
        }
    }

    /// Replace the snapshot with `shops`, then refresh the UI.
    ///
    /// The snapshot is replaced before the UI update is dispatched, so a
    /// failed dispatch still leaves the new snapshot in place.
    ///
    /// # Returns
    ///
    /// The number of shops now published.
    ///
    /// # Errors
    ///
    /// [`SessionError::UiGone`] if the UI lane has exited.
    pub fn publish(&self, shops: Vec<Shop>) -> Result<usize, SessionError> {
        let count = shops.len();
        self.snapshot.send_replace(Arc::from(shops));
        tracing::info!(count, "published shops");
        self.ui.show_count(count)?;
        Ok(count)
    }

    /// The snapshot as of now.
    pub fn current(&self) -> Arc<[Shop]> {
        self.snapshot.borrow().clone()
    }

    /// Number of shops in the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    /// Returns `true` if nothing (or an empty set) has been published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observe future snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<[Shop]>> {
        self.snapshot.subscribe()
    }
}
