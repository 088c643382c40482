use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use serde_json::json;

use plandag::dag::{DagGraph, Scheduler, validate};
use plandag::plan::{Plan, TaskResult, TaskStatus};
use plandag_test_utils::builders::{PlanBuilder, TaskBuilder};

// Strategy to generate a valid DAG plan.
// We ensure acyclicity by only allowing task N to depend on tasks 0..N-1.
fn dag_plan_strategy(max_tasks: usize) -> impl Strategy<Value = Plan> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );

        deps_strat.prop_map(move |raw_deps| {
            let mut builder = PlanBuilder::new();
            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let mut task = TaskBuilder::search(&format!("task-{i}"));
                let valid: HashSet<usize> = if i > 0 {
                    potential_deps.into_iter().map(|d| d % i).collect()
                } else {
                    HashSet::new()
                };
                let mut valid: Vec<usize> = valid.into_iter().collect();
                valid.sort_unstable();
                for d in valid {
                    task = task.after(&format!("task-{d}"));
                }
                builder = builder.with_task(task.build());
            }
            builder.build()
        })
    })
}

/// Drive the scheduler to completion, completing in-flight tasks in the
/// order given by `pick` and failing those in `failing`.
fn simulate(
    plan: &Plan,
    max_concurrency: usize,
    failing: &HashSet<String>,
    picks: &[usize],
) -> (Scheduler, Vec<Vec<String>>, usize) {
    let mut scheduler = Scheduler::new(DagGraph::from_tasks(&plan.tasks), max_concurrency);
    let mut running: Vec<String> = Vec::new();
    let mut dispatch_log = Vec::new();
    let mut peak = 0;

    let step = scheduler.step_dispatch();
    for t in step.dispatched {
        dispatch_log.push(t.task.dependencies.clone());
        running.push(t.task.id);
    }
    peak = peak.max(running.len());

    let mut pick = picks.iter().cycle();
    let mut steps = 0;
    while !running.is_empty() && steps < 1000 {
        steps += 1;
        let idx = pick.next().copied().unwrap_or(0) % running.len();
        let id = running.remove(idx);

        let started = scheduler
            .result_of(&id)
            .and_then(|r| r.started_at)
            .unwrap_or_else(chrono::Utc::now);
        let result = if failing.contains(&id) {
            TaskResult::failed(id.clone(), started, "scripted")
        } else {
            TaskResult::completed(id.clone(), started, json!(id))
        };

        // Before recording, every dependency of the newly dispatched tasks
        // must already be completed.
        let step = scheduler.step_completion(result);
        for t in step.dispatched {
            for dep in &t.task.dependencies {
                assert_eq!(scheduler.status_of(dep), Some(TaskStatus::Completed));
            }
            dispatch_log.push(t.task.dependencies.clone());
            running.push(t.task.id);
        }
        peak = peak.max(running.len());
    }

    (scheduler, dispatch_log, peak)
}

proptest! {
    #[test]
    fn scheduler_always_terminates_with_every_task_terminal(
        plan in dag_plan_strategy(12),
        max_concurrency in 1usize..5,
        failing_idx in proptest::collection::vec(0..12usize, 0..4),
        picks in proptest::collection::vec(any::<usize>(), 1..16),
    ) {
        let failing: HashSet<String> = failing_idx.iter().map(|i| format!("task-{i}")).collect();
        let (scheduler, _, peak) = simulate(&plan, max_concurrency, &failing, &picks);

        prop_assert!(scheduler.is_finished());
        prop_assert!(peak <= max_concurrency);
        prop_assert_eq!(scheduler.results().len(), plan.tasks.len());
        prop_assert!(scheduler.results().values().all(|r| r.is_terminal()));
    }

    #[test]
    fn statuses_follow_from_failures(
        plan in dag_plan_strategy(12),
        failing_idx in proptest::collection::vec(0..12usize, 0..4),
        picks in proptest::collection::vec(any::<usize>(), 1..16),
    ) {
        let failing: HashSet<String> = failing_idx.iter().map(|i| format!("task-{i}")).collect();
        let (scheduler, _, _) = simulate(&plan, 3, &failing, &picks);

        // Reference model: a task is skipped iff some dependency is not
        // completed; otherwise it ran and failed iff it is in `failing`.
        let mut expected: HashMap<String, TaskStatus> = HashMap::new();
        for task in &plan.tasks {
            let blocked = task
                .dependencies
                .iter()
                .any(|d| expected.get(d) != Some(&TaskStatus::Completed));
            let status = if blocked {
                TaskStatus::Skipped
            } else if failing.contains(&task.id) {
                TaskStatus::Failed
            } else {
                TaskStatus::Completed
            };
            expected.insert(task.id.clone(), status);
        }

        for (id, status) in &expected {
            prop_assert_eq!(scheduler.status_of(id), Some(*status), "task {}", id);
        }
    }

    #[test]
    fn validator_order_respects_every_edge(plan in dag_plan_strategy(15)) {
        let graph = DagGraph::from_tasks(&plan.tasks);
        let validation = validate(&graph);
        prop_assert!(validation.is_acyclic());
        prop_assert_eq!(validation.order.len(), plan.tasks.len());

        let position: HashMap<&str, usize> = validation
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        for task in &plan.tasks {
            for dep in &task.dependencies {
                prop_assert!(position[dep.as_str()] < position[task.id.as_str()]);
            }
        }
    }
}
