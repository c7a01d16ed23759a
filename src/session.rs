//! Top-level entry point that wires the record store, the background lane,
//! the published state, and the UI lane into a single [`ShopSession`].
//!
//! The session is opened via [`ShopSessionBuilder`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::SessionError;
use crate::lane::{Completion, LaneConfig, LaneHandle, LaneTask, spawn_lane};
use crate::shop::Shop;
use crate::state::PublishedState;
use crate::storage::{FileStore, RecordStore};
use crate::ui::{CountLabel, LogLabel, UiHandle, spawn_ui_lane};

/// Default simulated latency per downloaded shop: 1 second.
const DEFAULT_FETCH_DELAY: Duration = Duration::from_secs(1);

/// Tunables for a [`ShopSession`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use shop_session::SessionConfig;
///
/// let config = SessionConfig::default();
/// assert_eq!(config.fetch_delay, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long the simulated download waits after each shop.
    pub fetch_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fetch_delay: DEFAULT_FETCH_DELAY,
        }
    }
}

/// Controller for one screen's worth of shops.
///
/// Owns the background lane (and through it the record store), the
/// published snapshot, and the UI lane that displays its count. The user
/// actions ([`initialize`](ShopSession::initialize),
/// [`replace_all_with_fresh_batch`](ShopSession::replace_all_with_fresh_batch),
/// [`append_additional_batch`](ShopSession::append_additional_batch)) only
/// enqueue work and return a [`Completion`] immediately.
///
/// Actions run one at a time in submission order, but nothing stops a
/// second action from being submitted while the first is still in flight.
/// A replace releases the lane between its delete and its download, and an
/// append releases it between its insert and its reload, so an action
/// submitted in either window runs in between.
///
/// `Clone` is cheap; clones drive the same lanes.
#[derive(Debug, Clone)]
pub struct ShopSession {
    lane: LaneHandle,
    state: PublishedState,
    ui: UiHandle,
    store_location: Option<PathBuf>,
}

impl ShopSession {
    /// Create a builder with default configuration.
    pub fn builder() -> ShopSessionBuilder {
        ShopSessionBuilder::new()
    }

    /// Load the persisted shops and publish them.
    ///
    /// # Errors
    ///
    /// [`SessionError::LaneGone`] if the lane has exited. Store failures are
    /// reported through the returned [`Completion`].
    pub fn initialize(&self) -> Result<Completion, SessionError> {
        self.lane.submit(|reply| LaneTask::Initialize { reply })
    }

    /// Delete every persisted shop, download a fresh batch of three,
    /// persist it, and publish it without reloading.
    ///
    /// # Errors
    ///
    /// [`SessionError::LaneGone`] if the lane has exited.
    pub fn replace_all_with_fresh_batch(&self) -> Result<Completion, SessionError> {
        self.lane.submit(|reply| LaneTask::ReplaceAll { reply })
    }

    /// Download three more shops, persist them alongside the existing ones,
    /// then reload and publish the full set.
    ///
    /// Like the replace, the reload is queued behind whatever was submitted
    /// while the download ran.
    ///
    /// Resolves to [`Outcome::Skipped`](crate::Outcome::Skipped) without
    /// touching the store if nothing is published when the task runs.
    ///
    /// # Errors
    ///
    /// [`SessionError::LaneGone`] if the lane has exited.
    pub fn append_additional_batch(&self) -> Result<Completion, SessionError> {
        self.lane.submit(|reply| LaneTask::Append { reply })
    }

    /// Read every persisted shop on the background lane.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Store`] -- the store read failed.
    /// * [`SessionError::LaneGone`] -- the lane has exited.
    pub async fn query_all(&self) -> Result<Vec<Shop>, SessionError> {
        self.lane.query_all().await
    }

    /// Delete every persisted shop on the background lane.
    ///
    /// Does not publish; the displayed count is unchanged.
    ///
    /// # Returns
    ///
    /// The number of shops removed.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Store`] -- the store delete failed.
    /// * [`SessionError::LaneGone`] -- the lane has exited.
    pub async fn delete_all(&self) -> Result<usize, SessionError> {
        self.lane.delete_all().await
    }

    /// Replace the published snapshot and refresh the UI.
    ///
    /// See [`PublishedState::publish`].
    ///
    /// # Errors
    ///
    /// [`SessionError::UiGone`] if the UI lane has exited.
    pub fn publish(&self, shops: Vec<Shop>) -> Result<usize, SessionError> {
        self.state.publish(shops)
    }

    /// The currently published shops.
    pub fn shops(&self) -> Arc<[Shop]> {
        self.state.current()
    }

    /// Observe every future replacement of the published shops.
    pub fn subscribe(&self) -> watch::Receiver<Arc<[Shop]>> {
        self.state.subscribe()
    }

    /// Wait until the label shows every count published so far.
    ///
    /// # Errors
    ///
    /// [`SessionError::UiGone`] if the UI lane has exited.
    pub async fn sync_ui(&self) -> Result<(), SessionError> {
        self.ui.flush().await
    }

    /// Where the record store keeps its data, if on disk.
    pub fn store_location(&self) -> Option<&Path> {
        self.store_location.as_deref()
    }

    /// Stop the background lane once the tasks already queued have run.
    ///
    /// Actions that have already started are finished, including a replace
    /// whose download is still queued. Anything submitted afterwards
    /// resolves to [`SessionError::LaneGone`].
    ///
    /// The UI lane stops by itself when the last session clone is dropped.
    pub fn shutdown(&self) {
        self.lane.shutdown();
    }

    /// Check whether the background lane is still running.
    pub fn is_alive(&self) -> bool {
        self.lane.is_alive()
    }
}

/// Builder for [`ShopSession`].
pub struct ShopSessionBuilder {
    label: Option<Box<dyn CountLabel>>,
    config: SessionConfig,
}

impl ShopSessionBuilder {
    /// Create a builder with default configuration and a [`LogLabel`].
    pub fn new() -> Self {
        Self {
            label: None,
            config: SessionConfig::default(),
        }
    }

    /// Set the simulated latency after each downloaded shop.
    ///
    /// Defaults to 1 second.
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn fetch_delay(mut self, delay: Duration) -> Self {
        self.config.fetch_delay = delay;
        self
    }

    /// Replace the whole configuration.
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the label that displays the published count.
    ///
    /// If not called, a [`LogLabel`] is used.
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn label(mut self, label: impl CountLabel) -> Self {
        self.label = Some(Box::new(label));
        self
    }

    /// Start both lanes around `store` and return the session.
    ///
    /// Nothing is loaded yet; call [`ShopSession::initialize`] for that.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if either lane cannot be started.
    pub fn open<S: RecordStore>(self, store: S) -> io::Result<ShopSession> {
        let store_location = store.location().map(Path::to_path_buf);
        if let Some(path) = &store_location {
            tracing::info!(path = %path.display(), "record store location");
        }

        let label = self
            .label
            .unwrap_or_else(|| Box::new(LogLabel) as Box<dyn CountLabel>);
        let ui = spawn_ui_lane(label)?;
        let state = PublishedState::new(ui.clone());
        let lane = spawn_lane(
            store,
            state.clone(),
            LaneConfig {
                fetch_delay: self.config.fetch_delay,
            },
        )?;

        Ok(ShopSession {
            lane,
            state,
            ui,
            store_location,
        })
    }

    /// Open a [`FileStore`] in `dir` and start the session around it.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the directory cannot be created or either
    /// lane cannot be started.
    pub fn open_in(self, dir: impl AsRef<Path>) -> io::Result<ShopSession> {
        let store = FileStore::open(dir)?;
        self.open(store)
    }
}

impl Default for ShopSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lane::Outcome;
    use crate::storage::MemoryStore;
    use crate::ui::RecordingLabel;
    use tempfile::TempDir;

    fn fast() -> ShopSessionBuilder {
        ShopSession::builder().fetch_delay(Duration::from_millis(1))
    }

    #[test]
    fn builder_defaults() {
        let builder = ShopSessionBuilder::default();
        assert_eq!(builder.config.fetch_delay, Duration::from_secs(1));
        assert!(builder.label.is_none());
    }

    #[test]
    fn config_overrides_fetch_delay() {
        let builder = ShopSession::builder().config(SessionConfig {
            fetch_delay: Duration::from_millis(5),
        });
        assert_eq!(builder.config.fetch_delay, Duration::from_millis(5));
    }

    #[tokio::test]
    async fn memory_store_has_no_location() {
        let session = fast().open(MemoryStore::new()).expect("open should succeed");
        assert!(session.store_location().is_none());
        assert!(session.is_alive());
    }

    #[tokio::test]
    async fn open_in_reports_file_location() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let session = fast().open_in(tmp.path()).expect("open should succeed");
        assert_eq!(
            session.store_location(),
            Some(tmp.path().join("shops.json").as_path())
        );
    }

    #[tokio::test]
    async fn label_receives_published_count() {
        let label = RecordingLabel::new();
        let session = fast()
            .label(label.clone())
            .open(MemoryStore::with_shops(vec![Shop::new("a")]))
            .expect("open should succeed");

        let outcome = session
            .initialize()
            .expect("submit should succeed")
            .await
            .expect("initialize should succeed");
        session.sync_ui().await.expect("sync should succeed");

        assert_eq!(outcome, Outcome::Published { count: 1 });
        assert_eq!(label.texts(), ["1"]);
    }

    #[tokio::test]
    async fn actions_after_shutdown_report_lane_gone() {
        let session = fast().open(MemoryStore::new()).expect("open should succeed");
        session.shutdown();

        assert!(matches!(
            session.query_all().await,
            Err(SessionError::LaneGone)
        ));
        assert!(!session.is_alive());
        assert!(matches!(
            session.initialize(),
            Err(SessionError::LaneGone)
        ));
    }
}
