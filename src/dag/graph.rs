// src/dag/graph.rs

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::warn;

use crate::plan::Task;
use crate::types::TaskId;

/// Structural problem found (and repaired) while building the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanIssue {
    /// `task` listed a dependency that is not in the plan.
    DanglingDependency { task: TaskId, dependency: TaskId },
    /// `task` listed itself as a dependency.
    SelfDependency { task: TaskId },
    /// `task` listed the same dependency more than once.
    DuplicateDependency { task: TaskId, dependency: TaskId },
    /// A second task with an already-used id; it is not executed.
    DuplicateTaskId { task: TaskId },
}

impl fmt::Display for PlanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanIssue::DanglingDependency { task, dependency } => {
                write!(f, "{task}: dropped unknown dependency '{dependency}'")
            }
            PlanIssue::SelfDependency { task } => {
                write!(f, "{task}: dropped dependency on itself")
            }
            PlanIssue::DuplicateDependency { task, dependency } => {
                write!(f, "{task}: dropped repeated dependency '{dependency}'")
            }
            PlanIssue::DuplicateTaskId { task } => {
                write!(f, "{task}: duplicate task id; later definition ignored")
            }
        }
    }
}

/// Dependency graph of a plan.
///
/// Nodes are tasks, edges point from a dependency to its dependent
/// (`task-1 -> task-2` when task-2 lists task-1). Node indices follow plan
/// order, which is what makes every traversal here deterministic.
///
/// Construction is forgiving: malformed references are dropped and recorded
/// as [`PlanIssue`]s rather than rejecting the plan.
#[derive(Debug, Clone)]
pub struct DagGraph {
    graph: DiGraph<TaskId, ()>,
    index: HashMap<TaskId, NodeIndex>,
    /// Tasks in plan order, with sanitised dependency lists.
    tasks: Vec<Task>,
    issues: Vec<PlanIssue>,
}

impl DagGraph {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut graph = DiGraph::new();
        let mut index: HashMap<TaskId, NodeIndex> = HashMap::new();
        let mut kept: Vec<Task> = Vec::with_capacity(tasks.len());
        let mut issues = Vec::new();

        // First pass: one node per distinct id.
        for task in tasks {
            if index.contains_key(&task.id) {
                warn!(task = %task.id, "duplicate task id in plan; ignoring later definition");
                issues.push(PlanIssue::DuplicateTaskId {
                    task: task.id.clone(),
                });
                continue;
            }
            let idx = graph.add_node(task.id.clone());
            index.insert(task.id.clone(), idx);
            kept.push(task.clone());
        }

        // Second pass: sanitise dependency lists and add edges.
        for task in kept.iter_mut() {
            let mut seen: HashSet<TaskId> = HashSet::new();
            let mut deps = Vec::with_capacity(task.dependencies.len());

            for dep in task.dependencies.iter() {
                let issue = if dep == &task.id {
                    Some(PlanIssue::SelfDependency {
                        task: task.id.clone(),
                    })
                } else if !index.contains_key(dep) {
                    Some(PlanIssue::DanglingDependency {
                        task: task.id.clone(),
                        dependency: dep.clone(),
                    })
                } else if !seen.insert(dep.clone()) {
                    Some(PlanIssue::DuplicateDependency {
                        task: task.id.clone(),
                        dependency: dep.clone(),
                    })
                } else {
                    None
                };

                match issue {
                    Some(issue) => {
                        warn!(task = %task.id, dep = %dep, %issue, "dropping malformed dependency reference");
                        issues.push(issue);
                    }
                    None => {
                        graph.add_edge(index[dep], index[&task.id], ());
                        deps.push(dep.clone());
                    }
                }
            }

            task.dependencies = deps;
        }

        Self {
            graph,
            index,
            tasks: kept,
            issues,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Tasks in plan order, dependency lists sanitised.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|idx| &self.tasks[idx.index()])
    }

    /// Task ids in plan order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.id.as_str())
    }

    /// Immediate (sanitised) dependencies of a task, in declared order.
    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.task(id)
            .map(|t| t.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task, in plan order.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };

        let mut dependents: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        dependents.sort();
        dependents
            .into_iter()
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    /// Problems repaired while building the graph.
    pub fn issues(&self) -> &[PlanIssue] {
        &self.issues
    }
}
