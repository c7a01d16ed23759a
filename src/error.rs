//! Crate-level error type for session operations.

/// Error returned when a session operation cannot complete.
///
/// Store failures are fail-fast: the operation that hit the error is
/// abandoned before anything is published, and the error is handed back
/// to whoever awaits the operation's [`Completion`](crate::Completion).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Record store I/O failure.
    ///
    /// The underlying store could not read, write, or delete records.
    /// Nothing from the failing operation was published.
    #[error("record store error: {0}")]
    Store(#[from] std::io::Error),

    /// Background lane exited.
    ///
    /// The lane that owns the record store has shut down, so no further
    /// operations can be queued.
    #[error("background lane is no longer running")]
    LaneGone,

    /// UI lane exited.
    ///
    /// The snapshot was replaced, but the label update could not be
    /// delivered because the UI lane is gone.
    #[error("UI lane is no longer running")]
    UiGone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_from_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume");
        let err = SessionError::from(io_err);
        assert!(matches!(err, SessionError::Store(_)));
        assert!(err.to_string().contains("read-only volume"));
    }

    #[test]
    fn lane_gone_display() {
        assert_eq!(
            SessionError::LaneGone.to_string(),
            "background lane is no longer running"
        );
    }

    #[test]
    fn ui_gone_display() {
        assert_eq!(SessionError::UiGone.to_string(), "UI lane is no longer running");
    }

    // Errors travel back over oneshot channels from the lane thread.
    const _: () = {
        #[allow(dead_code)]
        fn assert_send_sync<T: Send + Sync>() {}

        #[allow(dead_code)]
        fn check() {
            assert_send_sync::<SessionError>();
        }
    };
}
