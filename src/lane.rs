//! Serial background lane that owns the record store.
//!
//! The lane runs on a dedicated thread and processes [`LaneTask`]s from an
//! `mpsc` queue one at a time, strictly in submission order. It exclusively
//! owns the [`RecordStore`], so every store access happens here, and it
//! holds a clone of the [`PublishedState`] so it can publish results.
//!
//! Public API: [`Completion`] (future for a triggered action) and
//! [`Outcome`]. The crate-internal [`LaneHandle`] is wrapped by
//! [`ShopSession`](crate::ShopSession).

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::download::{ADDITIONAL_BATCH, FRESH_BATCH, download_batch};
use crate::error::SessionError;
use crate::state::PublishedState;
use crate::storage::RecordStore;

/// What a completed action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new snapshot of `count` shops was published.
    Published {
        /// Number of shops in the published snapshot.
        count: usize,
    },
    /// The action had nothing to do (appending to an empty list).
    Skipped,
}

/// Result type sent back through an action's reply channel.
type ActionResult = Result<Outcome, SessionError>;

/// Configuration for the lane loop.
pub(crate) struct LaneConfig {
    /// Simulated latency after each downloaded shop.
    pub fetch_delay: Duration,
}

/// Messages processed by the lane loop.
///
/// Each variant carries a `oneshot::Sender` for the lane to reply on once
/// the work completes.
pub(crate) enum LaneTask {
    /// Load the persisted set and publish it.
    Initialize { reply: oneshot::Sender<ActionResult> },

    /// Delete everything, then queue [`LaneTask::FinishReplace`].
    ReplaceAll { reply: oneshot::Sender<ActionResult> },

    /// Continuation of `ReplaceAll` once deletion has completed: download,
    /// persist and publish a fresh batch.
    FinishReplace { reply: oneshot::Sender<ActionResult> },

    /// Download and persist an additional batch, then queue
    /// [`LaneTask::FinishAppend`]. Skipped if nothing is published yet.
    Append { reply: oneshot::Sender<ActionResult> },

    /// Continuation of `Append` once the batch is persisted: reload the
    /// full set and publish it.
    FinishAppend { reply: oneshot::Sender<ActionResult> },

    /// Read the full persisted set.
    QueryAll {
        reply: oneshot::Sender<io::Result<Vec<crate::Shop>>>,
    },

    /// Delete the full persisted set.
    DeleteAll { reply: oneshot::Sender<io::Result<usize>> },

    /// Stop the lane after the tasks queued before this one, including any
    /// continuations those tasks queue.
    Shutdown,
}

impl LaneTask {
    /// Whether this task finishes an action that has already started.
    fn is_continuation(&self) -> bool {
        matches!(
            self,
            LaneTask::FinishReplace { .. } | LaneTask::FinishAppend { .. }
        )
    }
}

/// State owned by the lane thread.
struct Lane<S> {
    store: S,
    state: PublishedState,
    /// Lets the lane queue continuations behind already-submitted work
    /// without keeping its own queue open.
    requeue: mpsc::WeakUnboundedSender<LaneTask>,
    config: LaneConfig,
}

impl<S: RecordStore> Lane<S> {
    /// Handle one task. Returns `false` when the lane should stop.
    async fn handle(&mut self, task: LaneTask) -> bool {
        match task {
            LaneTask::Initialize { reply } => {
                let _span = tracing::info_span!("initialize").entered();
                let _ = reply.send(self.reload_and_publish());
            }

            // Like a store callback, the rest of the replace runs as a new
            // task at the back of the queue, so anything submitted meanwhile
            // runs first.
            LaneTask::ReplaceAll { reply } => match self.delete_all() {
                Ok(_) => {
                    if let Some(LaneTask::FinishReplace { reply }) =
                        self.defer(LaneTask::FinishReplace { reply })
                    {
                        let _ = reply.send(self.finish_replace().await);
                    }
                }
                Err(e) => {
                    let _ = reply.send(Err(e.into()));
                }
            },

            LaneTask::FinishReplace { reply } => {
                let result = self.finish_replace().await;
                let _ = reply.send(result);
            }

            // The reload after an append is queued the same way.
            LaneTask::Append { reply } => match self.download_additional().await {
                Ok(true) => {
                    if let Some(LaneTask::FinishAppend { reply }) =
                        self.defer(LaneTask::FinishAppend { reply })
                    {
                        let _ = reply.send(self.reload_and_publish());
                    }
                }
                Ok(false) => {
                    let _ = reply.send(Ok(Outcome::Skipped));
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },

            LaneTask::FinishAppend { reply } => {
                let _ = reply.send(self.reload_and_publish());
            }

            LaneTask::QueryAll { reply } => {
                let _ = reply.send(self.query_all());
            }

            LaneTask::DeleteAll { reply } => {
                let _ = reply.send(self.delete_all());
            }

            LaneTask::Shutdown => return false,
        }
        true
    }

    /// Queue `task` behind everything already submitted.
    ///
    /// Hands the task back if it could not be queued. Every handle is then
    /// gone, so nothing can race it and the caller runs it right away.
    fn defer(&self, task: LaneTask) -> Option<LaneTask> {
        match self.requeue.upgrade() {
            Some(tx) => tx.send(task).err().map(|e| e.0),
            None => Some(task),
        }
    }

    /// Download, persist and publish the fresh batch, without a reload.
    async fn finish_replace(&mut self) -> ActionResult {
        tracing::info!("downloading new shops");
        let shops = download_batch(FRESH_BATCH, self.config.fetch_delay).await;
        self.persist(&shops)?;
        let count = self.state.publish(shops)?;
        Ok(Outcome::Published { count })
    }

    /// Download and persist the additional batch.
    ///
    /// Returns `false` without touching the store if nothing is published.
    async fn download_additional(&mut self) -> Result<bool, SessionError> {
        if self.state.is_empty() {
            tracing::debug!("no shops published yet, skipping append");
            return Ok(false);
        }

        tracing::info!("downloading additional shops");
        let shops = download_batch(ADDITIONAL_BATCH, self.config.fetch_delay).await;
        self.persist(&shops)?;
        Ok(true)
    }

    fn reload_and_publish(&mut self) -> ActionResult {
        let shops = self.query_all()?;
        let count = self.state.publish(shops)?;
        Ok(Outcome::Published { count })
    }

    fn persist(&mut self, shops: &[crate::Shop]) -> io::Result<()> {
        self.store
            .insert_all(shops)
            .inspect(|_| tracing::info!(count = shops.len(), "persisted shops"))
            .inspect_err(|e| tracing::error!(error = %e, "failed to persist shops"))
    }

    fn query_all(&self) -> io::Result<Vec<crate::Shop>> {
        self.store
            .query_all()
            .inspect(|shops| tracing::info!(count = shops.len(), "loaded shops from store"))
            .inspect_err(|e| tracing::error!(error = %e, "failed to load shops"))
    }

    fn delete_all(&mut self) -> io::Result<usize> {
        self.store
            .delete_all()
            .inspect(|count| tracing::info!(count, "deleted existing shops"))
            .inspect_err(|e| tracing::error!(error = %e, "failed to delete shops"))
    }
}

/// Runs the lane loop on the calling thread until the queue closes or a
/// `Shutdown` task arrives, then finishes any queued continuations. The
/// store is dropped on exit.
fn run_lane<S: RecordStore>(
    store: S,
    state: PublishedState,
    mut rx: mpsc::UnboundedReceiver<LaneTask>,
    requeue: mpsc::WeakUnboundedSender<LaneTask>,
    config: LaneConfig,
    rt: tokio::runtime::Runtime,
) {
    let mut lane = Lane {
        store,
        state,
        requeue,
        config,
    };

    rt.block_on(async {
        tracing::debug!("background lane started");
        while let Some(task) = rx.recv().await {
            if !lane.handle(task).await {
                break;
            }
        }

        // Actions already under way may have continuations queued behind
        // the shutdown. Finish those; everything else is dropped, which
        // resolves its completion to `LaneGone`.
        rx.close();
        while let Ok(task) = rx.try_recv() {
            if task.is_continuation() {
                lane.handle(task).await;
            }
        }
        tracing::debug!("background lane stopped");
    });
}

/// Future resolving once a triggered action has finished on the lane.
///
/// Dropping a `Completion` does not cancel the action; the lane runs it to
/// the end regardless, the way a button press is never taken back.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<ActionResult>,
}

impl Future for Completion {
    type Output = Result<Outcome, SessionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.map_err(|_| SessionError::LaneGone).and_then(|r| r))
    }
}

/// Cloneable handle to a running lane.
#[derive(Debug, Clone)]
pub(crate) struct LaneHandle {
    sender: mpsc::UnboundedSender<LaneTask>,
}

impl LaneHandle {
    /// Queue an action without waiting for it.
    ///
    /// # Errors
    ///
    /// [`SessionError::LaneGone`] if the lane has exited.
    pub(crate) fn submit(
        &self,
        task: impl FnOnce(oneshot::Sender<ActionResult>) -> LaneTask,
    ) -> Result<Completion, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(task(tx))
            .map_err(|_| SessionError::LaneGone)?;
        Ok(Completion { rx })
    }

    /// Read the persisted set on the lane.
    pub(crate) async fn query_all(&self) -> Result<Vec<crate::Shop>, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LaneTask::QueryAll { reply: tx })
            .map_err(|_| SessionError::LaneGone)?;
        Ok(rx.await.map_err(|_| SessionError::LaneGone)??)
    }

    /// Delete the persisted set on the lane.
    pub(crate) async fn delete_all(&self) -> Result<usize, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LaneTask::DeleteAll { reply: tx })
            .map_err(|_| SessionError::LaneGone)?;
        Ok(rx.await.map_err(|_| SessionError::LaneGone)??)
    }

    /// Ask the lane to stop once the tasks already queued have run.
    pub(crate) fn shutdown(&self) {
        let _ = self.sender.send(LaneTask::Shutdown);
    }

    /// Check whether the lane is still running.
    pub(crate) fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Spawn a lane that owns `store` and publishes into `state`.
///
/// # Errors
///
/// Returns `io::Error` if the lane's runtime or thread cannot be created.
pub(crate) fn spawn_lane<S: RecordStore>(
    store: S,
    state: PublishedState,
    config: LaneConfig,
) -> io::Result<LaneHandle> {
    // A private current-thread runtime drives the lane's timers, so the
    // lane works the same whatever runtime (if any) the caller uses.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let (tx, rx) = mpsc::unbounded_channel();
    let requeue = tx.downgrade();

    std::thread::Builder::new()
        .name("shop-lane".to_owned())
        .spawn(move || run_lane(store, state, rx, requeue, config, rt))?;

    Ok(LaneHandle { sender: tx })
}
