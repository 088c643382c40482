// src/dag/validate.rs

//! Graph validation: Kahn ordering, cycle diagnostics, fallback ordering.
//!
//! None of this gates execution. The scheduler only ever follows dynamic
//! readiness; the order computed here is for display and diagnostics.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

use crate::dag::graph::DagGraph;
use crate::errors::CycleError;
use crate::plan::Task;
use crate::types::TaskId;

/// Result of [`validate`]: an order over all tasks plus an optional cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// A linear extension of the DAG, or (on a cycle) the resolvable prefix
    /// followed by [`fallback_order`] of the rest.
    pub order: Vec<TaskId>,
    pub error: Option<CycleError>,
}

impl Validation {
    pub fn is_acyclic(&self) -> bool {
        self.error.is_none()
    }
}

/// Validate a raw task list (building the sanitised graph first).
pub fn validate_tasks(tasks: &[Task]) -> (Vec<TaskId>, Option<CycleError>) {
    let graph = DagGraph::from_tasks(tasks);
    let v = validate(&graph);
    (v.order, v.error)
}

/// Kahn reduction over the graph.
///
/// Zero in-degree tasks are removed in FIFO order, seeded in plan order. If
/// fewer tasks are removed than exist, the rest are on or behind a cycle: a
/// [`CycleError`] names them and, when one can be traced, a concrete cycle.
pub fn validate(graph: &DagGraph) -> Validation {
    let mut in_degree: HashMap<&str, usize> = graph
        .tasks()
        .iter()
        .map(|t| (t.id.as_str(), t.dependencies.len()))
        .collect();

    let mut queue: VecDeque<&str> = graph
        .ids()
        .filter(|id| in_degree.get(id).copied() == Some(0))
        .collect();

    let mut order: Vec<TaskId> = Vec::with_capacity(graph.len());

    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        for dependent in graph.dependents_of(id) {
            if let Some(deg) = in_degree.get_mut(dependent) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if order.len() == graph.len() {
        return Validation { order, error: None };
    }

    let resolved: HashSet<&str> = order.iter().map(|s| s.as_str()).collect();
    let unresolved: Vec<&str> = graph.ids().filter(|id| !resolved.contains(id)).collect();
    let path = find_cycle(graph, &unresolved);

    let error = CycleError {
        unresolved: fallback_order(unresolved.iter().copied()),
        path,
    };
    warn!(%error, "plan dependency graph is not acyclic");

    order.extend(error.unresolved.iter().cloned());
    Validation {
        order,
        error: Some(error),
    }
}

/// Trace one concrete cycle among `unresolved` tasks.
///
/// Every unresolved task has at least one unresolved dependency, so walking
/// dependency edges from the first one must revisit a task. The returned path
/// follows declared edges (each id depends on the next) and repeats its first
/// id at the end.
fn find_cycle(graph: &DagGraph, unresolved: &[&str]) -> Option<Vec<TaskId>> {
    let pending: HashSet<&str> = unresolved.iter().copied().collect();
    let mut current = *unresolved.first()?;

    let mut path: Vec<&str> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    loop {
        if let Some(&start) = position.get(current) {
            let mut cycle: Vec<TaskId> = path[start..].iter().map(|s| s.to_string()).collect();
            cycle.push(current.to_string());
            return Some(cycle);
        }

        position.insert(current, path.len());
        path.push(current);

        current = graph
            .dependencies_of(current)
            .iter()
            .map(|d| d.as_str())
            .find(|d| pending.contains(d))?;
    }
}

/// Deterministic order for tasks that could not be topologically sorted:
/// by the numeric suffix of the id (`task-2` before `task-10`), then ids
/// without a numeric suffix alphabetically.
pub fn fallback_order<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<TaskId> {
    let mut ids: Vec<&str> = ids.into_iter().collect();
    ids.sort_by(|a, b| {
        let key = |id: &str| (numeric_suffix(id).is_none(), numeric_suffix(id));
        key(a).cmp(&key(b)).then_with(|| a.cmp(b))
    });
    ids.into_iter().map(|s| s.to_string()).collect()
}

/// Trailing decimal digits of an id, e.g. `task-12` -> 12.
pub fn numeric_suffix(id: &str) -> Option<u64> {
    let digits_start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    id[digits_start..].parse().ok()
}
