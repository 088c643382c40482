// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::ScheduledTask;
use crate::errors::{PlandagError, Result};
use crate::exec::ExecutorBackend;
use crate::plan::TaskResult;
use crate::types::TaskId;

use super::core::CoreRuntime;
use super::listener::ProgressListener;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Drives the DAG scheduler in response to `RuntimeEvent`s, and delegates
/// actual task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// scheduling semantics. Because events are consumed one at a time from a
/// single channel, every mutation of scheduling state is serialized on this
/// loop's turn.
pub struct Runtime<E: ExecutorBackend, L: ProgressListener> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    listener: L,
}

impl<E: ExecutorBackend, L: ProgressListener> fmt::Debug for Runtime<E, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend, L: ProgressListener> Runtime<E, L> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        listener: L,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            listener,
        }
    }

    /// Main event loop.
    ///
    /// - Dispatches the initial ready set.
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them into the core.
    /// - Executes the commands the core returns.
    /// - Stops once the core reports every task terminal.
    ///
    /// Returns the final result map, one entry per task.
    pub async fn run(mut self) -> Result<BTreeMap<TaskId, TaskResult>> {
        info!(
            tasks = self.core.scheduler().graph().len(),
            max_concurrency = self.core.scheduler().max_concurrency(),
            "plandag runtime started"
        );

        let mut step = self.core.start();
        loop {
            let keep_running = step.keep_running;
            self.execute_step(step).await?;

            if !keep_running {
                break;
            }

            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    warn!(
                        in_flight = self.core.scheduler().in_flight_count(),
                        "runtime event channel closed before the plan finished"
                    );
                    return Err(PlandagError::PlanError(
                        "executor stopped reporting before every task finished".to_string(),
                    ));
                }
            };

            debug!(?event, "runtime received event");
            step = self.core.step(event);
        }

        info!("runtime exiting");
        Ok(self.core.into_results())
    }

    async fn execute_step(&mut self, step: CoreStep) -> Result<()> {
        for command in step.commands {
            self.execute_command(command).await?;
        }
        Ok(())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Notify(update) => self.listener.on_update(&update),
            CoreCommand::NotifyRetry(notice) => self.listener.on_retry(&notice),
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let ids: Vec<_> = tasks.iter().map(|t| t.id()).collect();
        debug!(?ids, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
