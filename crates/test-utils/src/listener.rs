use std::sync::{Arc, Mutex};

use plandag::engine::ProgressListener;
use plandag::plan::{RetryNotice, TaskStatus, TaskUpdate};

#[derive(Default)]
struct Recorded {
    updates: Vec<TaskUpdate>,
    retries: Vec<RetryNotice>,
}

/// Listener that records everything it is told.
///
/// Clones share the same log, so keep one and hand the other to the engine.
#[derive(Clone, Default)]
pub struct RecordingListener {
    log: Arc<Mutex<Recorded>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<TaskUpdate> {
        self.log.lock().unwrap().updates.clone()
    }

    pub fn retries(&self) -> Vec<RetryNotice> {
        self.log.lock().unwrap().retries.clone()
    }

    /// Statuses reported for one task, in order.
    pub fn statuses_of(&self, task_id: &str) -> Vec<TaskStatus> {
        self.log
            .lock()
            .unwrap()
            .updates
            .iter()
            .filter(|u| u.task_id == task_id)
            .map(|u| u.status)
            .collect()
    }

    /// Position of the first update matching `task_id` and `status`.
    pub fn position(&self, task_id: &str, status: TaskStatus) -> Option<usize> {
        self.log
            .lock()
            .unwrap()
            .updates
            .iter()
            .position(|u| u.task_id == task_id && u.status == status)
    }
}

impl ProgressListener for RecordingListener {
    fn on_update(&mut self, update: &TaskUpdate) {
        self.log.lock().unwrap().updates.push(update.clone());
    }

    fn on_retry(&mut self, notice: &RetryNotice) {
        self.log.lock().unwrap().retries.push(notice.clone());
    }
}
