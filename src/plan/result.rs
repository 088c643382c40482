// src/plan/result.rs

//! Per-task results and the progress events derived from them.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::TaskId;

/// Lifecycle of a task inside one plan execution.
///
/// `Queued -> Running -> {Completed | Failed}`, or `Queued -> Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Outcome record for one task.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Tool invocation attempts made (0 for cache hits, input errors, skips).
    #[serde(default)]
    pub attempts: u32,
    /// Whether the payload was served from the result cache.
    #[serde(default)]
    pub cached: bool,
}

impl TaskResult {
    pub fn queued(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Queued,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
            attempts: 0,
            cached: false,
        }
    }

    pub fn completed(
        task_id: impl Into<TaskId>,
        started_at: DateTime<Utc>,
        payload: Value,
    ) -> Self {
        Self {
            status: TaskStatus::Completed,
            result: Some(payload),
            started_at: Some(started_at),
            completed_at: Some(Utc::now()),
            ..Self::queued(task_id)
        }
    }

    pub fn failed(
        task_id: impl Into<TaskId>,
        started_at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: TaskStatus::Failed,
            error: Some(error.into()),
            started_at: Some(started_at),
            completed_at: Some(Utc::now()),
            ..Self::queued(task_id)
        }
    }

    pub fn skipped(task_id: impl Into<TaskId>, error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Skipped,
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
            ..Self::queued(task_id)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Status transition delivered to progress listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskUpdate {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&TaskResult> for TaskUpdate {
    fn from(r: &TaskResult) -> Self {
        Self {
            task_id: r.task_id.clone(),
            status: r.status,
            result: r.result.clone(),
            error: r.error.clone(),
        }
    }
}

/// Emitted between two attempts of the same tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryNotice {
    pub task_id: TaskId,
    /// The attempt that just failed (1-based).
    pub attempt: u32,
    pub max_attempts: u32,
    pub next_delay: Duration,
    pub error: String,
}
