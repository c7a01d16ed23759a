//! UI-affine lane that owns the count label.
//!
//! Every label mutation runs on one dedicated thread, in the order the
//! updates were dispatched. Callers on other threads only ever hold a
//! [`UiHandle`], which enqueues updates without waiting for them.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};

use crate::error::SessionError;

/// A text label that displays the published shop count.
///
/// Implementations are moved onto the UI lane and only touched from there.
pub trait CountLabel: Send + 'static {
    /// Replace the displayed text.
    fn set_text(&mut self, text: &str);
}

impl CountLabel for Box<dyn CountLabel> {
    fn set_text(&mut self, text: &str) {
        (**self).set_text(text);
    }
}

/// Label that emits a `tracing` event for every update.
#[derive(Debug, Default)]
pub struct LogLabel;

impl CountLabel for LogLabel {
    fn set_text(&mut self, text: &str) {
        tracing::info!(text, "count label updated");
    }
}

/// Label that records every text it is given.
///
/// Clones share the same history, so a test can keep one clone and move the
/// other onto the UI lane.
#[derive(Debug, Clone, Default)]
pub struct RecordingLabel {
    texts: Arc<Mutex<Vec<String>>>,
}

impl RecordingLabel {
    /// Create a label with an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every text set so far, oldest first.
    pub fn texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The text currently displayed, if any was ever set.
    pub fn current(&self) -> Option<String> {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl CountLabel for RecordingLabel {
    fn set_text(&mut self, text: &str) {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_owned());
    }
}

/// Work items for the UI lane.
enum UiTask {
    /// Show `count` as decimal text.
    ShowCount(usize),
    /// Reply once every earlier task has been applied.
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle to the UI lane.
#[derive(Debug, Clone)]
pub struct UiHandle {
    sender: mpsc::UnboundedSender<UiTask>,
}

impl UiHandle {
    /// Dispatch "display `count`" onto the UI lane without waiting.
    ///
    /// # Errors
    ///
    /// [`SessionError::UiGone`] if the UI lane has exited.
    pub fn show_count(&self, count: usize) -> Result<(), SessionError> {
        self.sender
            .send(UiTask::ShowCount(count))
            .map_err(|_| SessionError::UiGone)
    }

    /// Wait until every update dispatched before this call has been applied.
    ///
    /// # Errors
    ///
    /// [`SessionError::UiGone`] if the UI lane has exited.
    pub async fn flush(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(UiTask::Flush(tx))
            .map_err(|_| SessionError::UiGone)?;
        rx.await.map_err(|_| SessionError::UiGone)
    }

    /// Check whether the UI lane is still running.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// A handle whose lane has already exited.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { sender: tx }
    }
}

/// Runs the UI lane until every [`UiHandle`] is dropped.
fn run_ui_lane<L: CountLabel>(mut label: L, mut rx: mpsc::UnboundedReceiver<UiTask>) {
    while let Some(task) = rx.blocking_recv() {
        match task {
            UiTask::ShowCount(count) => label.set_text(&count.to_string()),
            // Tasks are applied in order, so reaching this one means every
            // earlier update is on screen.
            UiTask::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
    tracing::debug!("ui lane stopped");
}

/// Start the UI lane on a dedicated thread that owns `label`.
///
/// # Errors
///
/// Returns `io::Error` if the thread cannot be spawned.
pub fn spawn_ui_lane<L: CountLabel>(label: L) -> io::Result<UiHandle> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("shop-ui".to_owned())
        .spawn(move || run_ui_lane(label, rx))?;
    Ok(UiHandle { sender: tx })
}
