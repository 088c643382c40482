// src/engine/execute.rs

//! One-call plan execution: validate, schedule, run, report.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::EngineSection;
use crate::dag::{DagGraph, PlanIssue, Scheduler, validate};
use crate::errors::{CycleError, Result};
use crate::exec::{RealExecutorBackend, TaskRunner};
use crate::plan::{Plan, TaskResult, TaskStatus};
use crate::types::TaskId;

use super::core::CoreRuntime;
use super::listener::ProgressListener;
use super::runtime::Runtime;
use super::RuntimeEvent;

/// Default ceiling on simultaneously running tasks.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub max_concurrency: usize,
    /// Buffer of the runtime event channel.
    pub channel_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            channel_capacity: 64,
        }
    }
}

impl EngineOptions {
    pub fn from_config(section: &EngineSection) -> Self {
        Self {
            max_concurrency: section.max_concurrency.max(1),
            ..Self::default()
        }
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }
}

/// Static analysis of a plan, without running anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanCheck {
    pub goal: String,
    /// Display order: a topological order, or the resolvable prefix plus the
    /// numeric-suffix fallback when there is a cycle.
    pub order: Vec<TaskId>,
    pub diagnostics: Vec<PlanIssue>,
    pub cycle: Option<CycleError>,
}

impl PlanCheck {
    pub fn of(plan: &Plan) -> Self {
        let graph = DagGraph::from_tasks(&plan.tasks);
        Self::of_graph(&plan.goal, &graph)
    }

    /// Same as [`PlanCheck::of`], over an already built graph.
    pub fn of_graph(goal: &str, graph: &DagGraph) -> Self {
        let validation = validate(graph);
        Self {
            goal: goal.to_string(),
            order: validation.order,
            diagnostics: graph.issues().to_vec(),
            cycle: validation.error,
        }
    }
}

/// Counters over a finished result map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cached: usize,
}

impl ReportSummary {
    pub fn of<'a>(results: impl IntoIterator<Item = &'a TaskResult>) -> Self {
        let mut s = Self::default();
        for r in results {
            s.total += 1;
            match r.status {
                TaskStatus::Completed => s.completed += 1,
                TaskStatus::Failed => s.failed += 1,
                TaskStatus::Skipped => s.skipped += 1,
                TaskStatus::Queued | TaskStatus::Running => {}
            }
            if r.cached {
                s.cached += 1;
            }
        }
        s
    }
}

/// Everything a result consumer needs once a plan has run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub goal: String,
    /// One entry per (deduplicated) task in the plan.
    pub results: BTreeMap<TaskId, TaskResult>,
    pub order: Vec<TaskId>,
    pub diagnostics: Vec<PlanIssue>,
    pub cycle: Option<CycleError>,
    pub summary: ReportSummary,
}

impl ExecutionReport {
    pub fn new(check: PlanCheck, results: BTreeMap<TaskId, TaskResult>) -> Self {
        let summary = ReportSummary::of(results.values());
        Self {
            goal: check.goal,
            results,
            order: check.order,
            diagnostics: check.diagnostics,
            cycle: check.cycle,
            summary,
        }
    }

    pub fn result(&self, id: &str) -> Option<&TaskResult> {
        self.results.get(id)
    }

    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.results.get(id).map(|r| r.status)
    }

    /// Results in display order.
    pub fn ordered_results(&self) -> impl Iterator<Item = &TaskResult> {
        self.order.iter().filter_map(|id| self.results.get(id))
    }

    /// Every task completed.
    pub fn is_success(&self) -> bool {
        self.summary.completed == self.summary.total
    }
}

/// Executes plans against a shared [`TaskRunner`].
///
/// One `Engine` can run any number of plans, sequentially or concurrently;
/// each `execute` call owns its own scheduler and event channel. Only the
/// runner (and therefore the cache) is shared.
#[derive(Debug, Clone)]
pub struct Engine {
    runner: Arc<TaskRunner>,
    options: EngineOptions,
}

impl Engine {
    pub fn new(runner: TaskRunner, options: EngineOptions) -> Self {
        Self {
            runner: Arc::new(runner),
            options,
        }
    }

    pub fn runner(&self) -> &Arc<TaskRunner> {
        &self.runner
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Validate and run `plan` to quiescence, reporting every status
    /// transition to `listener`.
    ///
    /// Task failures are part of the report, not an `Err`. Cycles do not
    /// abort execution: the acyclic part runs and the rest is skipped.
    pub async fn execute<L: ProgressListener>(
        &self,
        plan: &Plan,
        listener: L,
    ) -> Result<ExecutionReport> {
        let graph = DagGraph::from_tasks(&plan.tasks);
        let check = PlanCheck::of_graph(&plan.goal, &graph);

        if !check.diagnostics.is_empty() {
            warn!(issues = check.diagnostics.len(), "plan had structural issues; offending references were dropped");
        }
        if let Some(cycle) = &check.cycle {
            warn!(error = %cycle, "plan contains a cycle; affected tasks will be skipped");
        }
        info!(goal = %plan.goal, tasks = graph.len(), "executing plan");

        let scheduler = Scheduler::new(graph, self.options.max_concurrency);
        let (tx, rx) = mpsc::channel::<RuntimeEvent>(self.options.channel_capacity.max(1));
        let executor = RealExecutorBackend::new(Arc::clone(&self.runner), tx);

        let runtime = Runtime::new(CoreRuntime::new(scheduler), rx, executor, listener);
        let results = runtime.run().await?;

        let report = ExecutionReport::new(check, results);
        info!(
            completed = report.summary.completed,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            cached = report.summary.cached,
            "plan finished"
        );
        Ok(report)
    }
}
