// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime hands dispatched tasks to an `ExecutorBackend` and waits for
//! `RuntimeEvent`s to come back. This keeps the event loop free of tool,
//! cache and retry concerns, and lets tests swap in a backend that completes
//! tasks synchronously.
//!
//! - `RealExecutorBackend` spawns one tokio task per dispatched plan task and
//!   runs it through the shared [`TaskRunner`].
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were scheduled and directly emits `TaskCompleted` events.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{Result, TaskError};
use crate::exec::task_runner::TaskRunner;
use crate::plan::TaskResult;
use crate::types::BoxFuture;

/// Trait abstracting how scheduled tasks are executed.
///
/// Implementations must eventually send exactly one
/// [`RuntimeEvent::TaskCompleted`] per task they accept, or the runtime will
/// wait forever.
pub trait ExecutorBackend: Send {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>>;
}

/// Production backend: one tokio task per plan task.
///
/// A panic inside a run is caught at the join handle and reported as a
/// `failed` result, so the runtime always hears back.
#[derive(Debug, Clone)]
pub struct RealExecutorBackend {
    runner: Arc<TaskRunner>,
    tx: mpsc::Sender<RuntimeEvent>,
}

impl RealExecutorBackend {
    pub fn new(runner: Arc<TaskRunner>, tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { runner, tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            for scheduled in tasks {
                spawn_one(Arc::clone(&self.runner), self.tx.clone(), scheduled);
            }
            Ok(())
        })
    }
}

fn spawn_one(runner: Arc<TaskRunner>, tx: mpsc::Sender<RuntimeEvent>, scheduled: ScheduledTask) {
    let id = scheduled.task.id.clone();
    let started_at = scheduled.dispatched_at;
    debug!(task = %id, tool = %scheduled.task.tool, "spawning task");

    tokio::spawn(async move {
        let retry_tx = tx.clone();
        let work = tokio::spawn(async move {
            let on_retry = move |notice| {
                // Notices are advisory; never block a run on a slow consumer.
                if let Err(err) = retry_tx.try_send(RuntimeEvent::TaskRetrying(notice)) {
                    debug!(error = %err, "dropping retry notice");
                }
            };
            runner
                .run_with_hook(&scheduled.task, &scheduled.dependency_results, &on_retry)
                .await
        });

        let result = match work.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(task = %id, error = %join_err, "task run aborted");
                let err = TaskError::Aborted(join_err.to_string());
                TaskResult::failed(id.clone(), started_at, err.to_string())
            }
        };

        if tx.send(RuntimeEvent::TaskCompleted { result }).await.is_err() {
            warn!(task = %id, "runtime gone before task completion could be reported");
        }
    });
}
