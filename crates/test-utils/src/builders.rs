#![allow(dead_code)]

use serde_json::Value;
use plandag::plan::{ParamMap, Plan, Task};
use plandag::tools::ToolKind;

/// Builder for `Plan` to simplify test setup.
pub struct PlanBuilder {
    plan: Plan,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            plan: Plan::default(),
        }
    }

    pub fn goal(mut self, goal: &str) -> Self {
        self.plan.goal = goal.to_string();
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.plan.tasks.push(task);
        self
    }

    pub fn build(self) -> Plan {
        self.plan
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Task`.
///
/// Every task gets its tool's required argument set to its own id unless
/// overridden, so scripted invokers can key outcomes by task id.
pub struct TaskBuilder {
    task: Task,
    params: ParamMap,
}

impl TaskBuilder {
    pub fn new(id: &str, tool: ToolKind) -> Self {
        let mut params = ParamMap::new();
        params.insert(tool.required_field().to_string(), Value::String(id.to_string()));
        Self {
            task: Task::new(id, tool, format!("{tool} for {id}")),
            params,
        }
    }

    /// `search` task whose query is its id.
    pub fn search(id: &str) -> Self {
        Self::new(id, ToolKind::Search)
    }

    pub fn description(mut self, description: &str) -> Self {
        self.task.description = description.to_string();
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.dependencies.push(dep.to_string());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Drop a parameter, e.g. the default required argument.
    pub fn without_param(mut self, key: &str) -> Self {
        self.params.remove(key);
        self
    }

    pub fn build(mut self) -> Task {
        self.task.parameters = Some(self.params);
        self.task
    }
}

/// Linear chain `task-1 <- task-2 <- ... <- task-n` of search tasks.
pub fn chain_plan(n: usize) -> Plan {
    let mut builder = PlanBuilder::new().goal("chain");
    for i in 1..=n {
        let id = format!("task-{i}");
        let mut task = TaskBuilder::search(&id);
        if i > 1 {
            task = task.after(&format!("task-{}", i - 1));
        }
        builder = builder.with_task(task.build());
    }
    builder.build()
}

/// `n` independent search tasks.
pub fn independent_plan(n: usize) -> Plan {
    let mut builder = PlanBuilder::new().goal("independent");
    for i in 1..=n {
        builder = builder.with_task(TaskBuilder::search(&format!("task-{i}")).build());
    }
    builder.build()
}
