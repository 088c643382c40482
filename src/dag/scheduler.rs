// src/dag/scheduler.rs

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::task_info::{DependencyResults, ScheduledTask};
use crate::plan::{TaskResult, TaskStatus, TaskUpdate};
use crate::types::TaskId;

/// Per-plan scheduling state machine.
///
/// Pure and synchronous: it never spawns or awaits anything. The async
/// runtime feeds it completions and acts on the [`SchedulerStep`]s it returns,
/// so every mutation happens on the coordinator's turn.
///
/// It is responsible for:
/// - tracking remaining-dependency counts and the FIFO ready queue
/// - enforcing the concurrency ceiling when dispatching
/// - recording results and releasing dependents on success
/// - skipping every transitive dependent of a failed task, eagerly
/// - accounting for tasks that can never become ready (cycles) once the
///   plan has drained
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    max_concurrency: usize,
    remaining: HashMap<TaskId, usize>,
    ready: VecDeque<TaskId>,
    in_flight: HashSet<TaskId>,
    completed: HashSet<TaskId>,
    /// Failed *or* skipped: anything a dependent can no longer rely on.
    failed: HashSet<TaskId>,
    results: BTreeMap<TaskId, TaskResult>,
}

impl Scheduler {
    pub fn new(graph: DagGraph, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);

        let mut remaining = HashMap::new();
        let mut ready = VecDeque::new();
        let mut results = BTreeMap::new();

        for task in graph.tasks() {
            let count = task.dependencies.len();
            remaining.insert(task.id.clone(), count);
            if count == 0 {
                ready.push_back(task.id.clone());
            }
            results.insert(task.id.clone(), TaskResult::queued(task.id.clone()));
        }

        debug!(
            tasks = graph.len(),
            ready = ready.len(),
            max_concurrency,
            "scheduler initialised"
        );

        Self {
            graph,
            max_concurrency,
            remaining,
            ready,
            in_flight: HashSet::new(),
            completed: HashSet::new(),
            failed: HashSet::new(),
            results,
        }
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Current status of a task, or `None` if the id is unknown.
    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.results.get(id).map(|r| r.status)
    }

    pub fn result_of(&self, id: &str) -> Option<&TaskResult> {
        self.results.get(id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn ready_ids(&self) -> impl Iterator<Item = &str> {
        self.ready.iter().map(|s| s.as_str())
    }

    /// Nothing running and nothing ready to run.
    pub fn is_quiescent(&self) -> bool {
        self.in_flight.is_empty() && self.ready.is_empty()
    }

    /// Quiescent and every task has a terminal status.
    pub fn is_finished(&self) -> bool {
        self.is_quiescent() && self.results.values().all(TaskResult::is_terminal)
    }

    /// Whether every dependency of `id` has completed.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, id: &str) -> Option<bool> {
        let task = self.graph.task(id)?;
        Some(task.dependencies.iter().all(|d| self.completed.contains(d)))
    }

    pub fn results(&self) -> &BTreeMap<TaskId, TaskResult> {
        &self.results
    }

    pub fn into_results(self) -> BTreeMap<TaskId, TaskResult> {
        self.results
    }

    /// Fill free capacity from the ready queue.
    ///
    /// Call once to start a plan; completions call it internally.
    pub fn step_dispatch(&mut self) -> SchedulerStep {
        let mut step = SchedulerStep::default();
        self.dispatch_into(&mut step);
        step
    }

    /// Record the terminal result of an in-flight task, then dispatch
    /// whatever became ready.
    ///
    /// Results for tasks that are not in flight are ignored.
    pub fn step_completion(&mut self, mut result: TaskResult) -> SchedulerStep {
        let mut step = SchedulerStep::default();
        let id = result.task_id.clone();

        if !self.in_flight.remove(&id) {
            warn!(task = %id, status = %result.status, "completion for a task that is not in flight; ignoring");
            step.finished = self.is_finished();
            return step;
        }

        if let Some(prev) = self.results.get(&id) {
            // Keep the dispatch timestamp: that is when `running` was emitted.
            result.started_at = prev.started_at.or(result.started_at);
        }

        match result.status {
            TaskStatus::Completed => {
                debug!(task = %id, cached = result.cached, "task completed");
                self.record(result, &mut step);
                self.completed.insert(id.clone());
                self.release_dependents(&id);
            }
            TaskStatus::Failed => {
                warn!(task = %id, error = ?result.error, "task failed; skipping its dependents");
                self.record(result, &mut step);
                self.failed.insert(id.clone());
                self.skip_dependents_of(&id, &mut step);
            }
            other => {
                warn!(task = %id, status = %other, "unexpected status reported as completion; treating as failure");
                let started = result.started_at.unwrap_or_else(Utc::now);
                let failed = TaskResult::failed(
                    id.clone(),
                    started,
                    format!("task reported unexpected status '{other}'"),
                );
                self.record(failed, &mut step);
                self.failed.insert(id.clone());
                self.skip_dependents_of(&id, &mut step);
            }
        }

        self.dispatch_into(&mut step);
        step
    }

    fn dispatch_into(&mut self, step: &mut SchedulerStep) {
        while self.in_flight.len() < self.max_concurrency {
            let Some(id) = self.ready.pop_front() else {
                break;
            };

            if self.status_of(&id) != Some(TaskStatus::Queued) {
                debug!(task = %id, "ready task already terminal; not dispatching");
                continue;
            }

            let deps = self.graph.dependencies_of(&id).to_vec();
            let failed_deps: Vec<TaskId> = deps
                .iter()
                .filter(|d| self.failed.contains(*d))
                .cloned()
                .collect();

            if !failed_deps.is_empty() {
                self.skip(&id, &failed_deps, step);
                self.skip_dependents_of(&id, step);
                continue;
            }

            if !deps.iter().all(|d| self.completed.contains(d)) {
                warn!(task = %id, "task reached the ready queue with incomplete dependencies; holding back");
                continue;
            }

            self.dispatch(&id, &deps, step);
        }

        if self.is_quiescent() {
            self.skip_unreachable(step);
            step.finished = true;
        }
    }

    fn dispatch(&mut self, id: &str, deps: &[TaskId], step: &mut SchedulerStep) {
        let Some(task) = self.graph.task(id).cloned() else {
            return;
        };

        let dependency_results: DependencyResults = deps
            .iter()
            .filter_map(|d| {
                let payload = self.results.get(d)?.result.clone()?;
                Some((d.clone(), payload))
            })
            .collect();

        let now = Utc::now();
        if let Some(entry) = self.results.get_mut(id) {
            entry.status = TaskStatus::Running;
            entry.started_at = Some(now);
            step.updates.push(TaskUpdate::from(&*entry));
        }
        self.in_flight.insert(id.to_string());

        info!(task = %id, tool = %task.tool, in_flight = self.in_flight.len(), "dispatching task");

        step.dispatched.push(ScheduledTask {
            task,
            dependency_results,
            dispatched_at: now,
        });
    }

    /// Decrement dependents' counters and enqueue those that hit zero.
    fn release_dependents(&mut self, id: &str) {
        let dependents: Vec<TaskId> = self
            .graph
            .dependents_of(id)
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        for dep in dependents {
            if let Some(count) = self.remaining.get_mut(&dep) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    debug!(task = %dep, "all dependencies completed; task is ready");
                    self.ready.push_back(dep);
                }
            }
        }
    }

    /// Skip every not-yet-dispatched transitive dependent of `root`.
    fn skip_dependents_of(&mut self, root: &str, step: &mut SchedulerStep) {
        let mut queue: VecDeque<TaskId> = VecDeque::from([root.to_string()]);

        while let Some(current) = queue.pop_front() {
            let dependents: Vec<TaskId> = self
                .graph
                .dependents_of(&current)
                .into_iter()
                .map(|s| s.to_string())
                .collect();

            for dep in dependents {
                if self.status_of(&dep) != Some(TaskStatus::Queued) {
                    continue;
                }
                let blocked_by: Vec<TaskId> = self
                    .graph
                    .dependencies_of(&dep)
                    .iter()
                    .filter(|d| self.failed.contains(*d))
                    .cloned()
                    .collect();
                self.skip(&dep, &blocked_by, step);
                queue.push_back(dep);
            }
        }
    }

    /// Once drained, anything still queued can never become ready.
    fn skip_unreachable(&mut self, step: &mut SchedulerStep) {
        let stuck: Vec<TaskId> = self
            .graph
            .ids()
            .filter(|id| self.status_of(id) == Some(TaskStatus::Queued))
            .map(|s| s.to_string())
            .collect();

        for id in stuck {
            let unresolved: Vec<TaskId> = self
                .graph
                .dependencies_of(&id)
                .iter()
                .filter(|d| !self.completed.contains(*d))
                .cloned()
                .collect();

            warn!(task = %id, ?unresolved, "task can never become ready; skipping");
            let result = TaskResult::skipped(
                id.clone(),
                format!(
                    "unresolvable dependencies (cycle): {}",
                    unresolved.join(", ")
                ),
            );
            self.failed.insert(id);
            self.record(result, step);
        }
    }

    fn skip(&mut self, id: &str, blocked_by: &[TaskId], step: &mut SchedulerStep) {
        info!(task = %id, ?blocked_by, "skipping task: upstream dependency failed");
        let result = TaskResult::skipped(
            id.to_string(),
            format!("dependency failed: {}", blocked_by.join(", ")),
        );
        self.failed.insert(id.to_string());
        self.record(result, step);
    }

    fn record(&mut self, result: TaskResult, step: &mut SchedulerStep) {
        step.updates.push(TaskUpdate::from(&result));
        self.results.insert(result.task_id.clone(), result);
    }
}
