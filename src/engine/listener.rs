// src/engine/listener.rs

use crate::plan::{RetryNotice, TaskUpdate};

/// Receives the engine's status stream.
///
/// Called on the coordinator's turn, one call at a time, in the order the
/// transitions happened. Keep implementations quick; they delay scheduling.
pub trait ProgressListener: Send {
    fn on_update(&mut self, update: &TaskUpdate);

    /// A failed attempt is about to be retried. Ignored by default.
    fn on_retry(&mut self, _notice: &RetryNotice) {}
}

impl<F> ProgressListener for F
where
    F: FnMut(&TaskUpdate) + Send,
{
    fn on_update(&mut self, update: &TaskUpdate) {
        self(update)
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ProgressListener for NoopListener {
    fn on_update(&mut self, _update: &TaskUpdate) {}
}
