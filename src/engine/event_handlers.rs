// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep};
use crate::plan::{RetryNotice, TaskResult, TaskUpdate};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Tell the listener about a status transition.
    Notify(TaskUpdate),
    /// Tell the listener a task is backing off before another attempt.
    NotifyRetry(RetryNotice),
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    /// Translate a scheduler step into shell commands.
    ///
    /// Notifications come first so a task's `running` update is delivered
    /// before the executor can possibly report its completion.
    pub fn from_scheduler(step: SchedulerStep) -> Self {
        let mut commands: Vec<CoreCommand> =
            step.updates.into_iter().map(CoreCommand::Notify).collect();
        if !step.dispatched.is_empty() {
            commands.push(CoreCommand::DispatchTasks(step.dispatched));
        }
        Self {
            commands,
            keep_running: !step.finished,
        }
    }
}

/// Handle the very first step of a plan: fill capacity from the roots.
pub fn handle_start(scheduler: &mut Scheduler) -> CoreStep {
    CoreStep::from_scheduler(scheduler.step_dispatch())
}

/// Handle a task completion event.
pub fn handle_task_completion(scheduler: &mut Scheduler, result: TaskResult) -> CoreStep {
    CoreStep::from_scheduler(scheduler.step_completion(result))
}

/// Handle a retry notice. Scheduler state is untouched: the task stays
/// `running` until its terminal result arrives.
pub fn handle_task_retry(scheduler: &Scheduler, notice: RetryNotice) -> CoreStep {
    CoreStep {
        commands: vec![CoreCommand::NotifyRetry(notice)],
        keep_running: !scheduler.is_finished(),
    }
}
