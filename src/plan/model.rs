// src/plan/model.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::ToolKind;
use crate::types::TaskId;

/// Concrete tool arguments, keyed by field name.
pub type ParamMap = Map<String, Value>;

/// One unit of work in a plan: a single tool invocation.
///
/// As JSON:
///
/// ```json
/// { "id": "task-2", "description": "Weather in the capital",
///   "tool": "weather", "dependencies": ["task-1"],
///   "parameters": { "city": "{{task-1.capital}}" } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Task {
    pub id: TaskId,

    #[serde(default)]
    pub description: String,

    pub tool: ToolKind,

    /// Ids of tasks that must complete before this one may start.
    ///
    /// Dangling, duplicate and self references are dropped when the graph is
    /// built; see [`crate::dag::DagGraph::from_tasks`].
    #[serde(default)]
    pub dependencies: Vec<TaskId>,

    /// Pre-resolved arguments supplied by the plan producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamMap>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, tool: ToolKind, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            tool,
            dependencies: Vec::new(),
            parameters: None,
        }
    }
}

/// A plan as produced by the (external) plan producer.
///
/// Task order is only meaningful for display; execution follows readiness.
/// In TOML, tasks are `[[task]]` tables:
///
/// ```toml
/// goal = "What should I wear in the capital of France?"
///
/// [[task]]
/// id = "task-1"
/// tool = "search"
/// description = "Capital of France"
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Plan {
    #[serde(default)]
    pub goal: String,

    #[serde(default, rename = "task", alias = "tasks")]
    pub tasks: Vec<Task>,
}

impl Plan {
    pub fn new(goal: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            goal: goal.into(),
            tasks,
        }
    }
}
