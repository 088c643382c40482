// src/dag/task_info.rs

//! Types describing a task the scheduler has released for execution.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::plan::Task;
use crate::types::TaskId;

/// Payloads of a task's completed dependencies, keyed by dependency id.
pub type DependencyResults = BTreeMap<TaskId, Value>;

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    /// The task, with its sanitised dependency list.
    pub task: Task,
    /// Results of every dependency; all of them completed.
    pub dependency_results: DependencyResults,
    /// When the scheduler dispatched it (the `running` transition).
    pub dispatched_at: DateTime<Utc>,
}

impl ScheduledTask {
    pub fn id(&self) -> &str {
        &self.task.id
    }
}
