// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::plan::TaskUpdate;

/// Structured result of a single scheduler "step".
///
/// The async runtime turns this into IO (dispatching tasks, notifying the
/// listener); tests use it to step the DAG by hand.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that were moved to `running` and must be executed now.
    pub dispatched: Vec<ScheduledTask>,
    /// Status transitions produced by this step, in the order they happened.
    pub updates: Vec<TaskUpdate>,
    /// Whether this step left the scheduler quiescent (nothing in flight,
    /// nothing ready, every task terminal).
    pub finished: bool,
}

impl SchedulerStep {
    pub fn dispatched_ids(&self) -> Vec<&str> {
        self.dispatched.iter().map(|t| t.id()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatched.is_empty() && self.updates.is_empty()
    }
}
