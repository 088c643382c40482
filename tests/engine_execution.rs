// tests/engine_execution.rs

mod common;
use crate::common::{engine, init_tracing, with_timeout};

use std::error::Error;
use std::time::Duration;

use serde_json::json;

use plandag::dag::PlanIssue;
use plandag::engine::NoopListener;
use plandag::plan::TaskStatus;
use plandag::tools::ToolKind;
use plandag_test_utils::builders::{PlanBuilder, TaskBuilder, chain_plan, independent_plan};
use plandag_test_utils::fake_invoker::{Script, ScriptedInvoker};
use plandag_test_utils::listener::RecordingListener;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn chain_runs_in_dependency_order() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new();
    let listener = RecordingListener::new();
    let report = with_timeout(engine(&invoker, 3).execute(&chain_plan(3), listener.clone())).await?;

    assert_eq!(report.summary.completed, 3);
    assert_eq!(invoker.call_order(), vec!["task-1", "task-2", "task-3"]);

    for pair in [("task-1", "task-2"), ("task-2", "task-3")] {
        let upstream = report.result(pair.0).ok_or("missing upstream")?;
        let downstream = report.result(pair.1).ok_or("missing downstream")?;
        assert!(upstream.completed_at <= downstream.started_at);

        let done = listener.position(pair.0, TaskStatus::Completed).ok_or("no completed update")?;
        let started = listener.position(pair.1, TaskStatus::Running).ok_or("no running update")?;
        assert!(done < started, "{} started before {} completed", pair.1, pair.0);
    }
    Ok(())
}

#[tokio::test]
async fn each_task_reports_running_then_one_terminal_update() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new();
    let listener = RecordingListener::new();
    with_timeout(engine(&invoker, 2).execute(&chain_plan(4), listener.clone())).await?;

    for i in 1..=4 {
        assert_eq!(
            listener.statuses_of(&format!("task-{i}")),
            vec![TaskStatus::Running, TaskStatus::Completed]
        );
    }
    assert_eq!(listener.updates().len(), 8);
    Ok(())
}

#[tokio::test]
async fn dependency_payloads_feed_templated_parameters() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new().succeed("capital of france", json!({ "capital": "Paris" }));
    let plan = PlanBuilder::new()
        .with_task(TaskBuilder::search("task-1").param("query", "capital of france").build())
        .with_task(
            TaskBuilder::new("task-2", ToolKind::Weather)
                .param("city", "{{task-1.capital}}")
                .after("task-1")
                .build(),
        )
        .build();

    let report = with_timeout(engine(&invoker, 3).execute(&plan, NoopListener)).await?;

    let weather = report.result("task-2").ok_or("missing task-2")?;
    assert_eq!(weather.status, TaskStatus::Completed);
    assert_eq!(weather.result, Some(json!({ "tool": "weather", "input": "Paris" })));
    Ok(())
}

#[tokio::test]
async fn failed_task_skips_its_dependents_but_not_siblings() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new().fail("task-1", "boom");
    let listener = RecordingListener::new();
    let plan = PlanBuilder::new()
        .with_task(TaskBuilder::search("task-1").build())
        .with_task(TaskBuilder::search("task-2").after("task-1").build())
        .with_task(TaskBuilder::search("task-3").build())
        .build();

    let report = with_timeout(engine(&invoker, 3).execute(&plan, listener.clone())).await?;

    let failed = report.result("task-1").ok_or("missing task-1")?;
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.attempts, 3);
    assert!(failed.error.as_deref().unwrap_or_default().contains("boom"));

    let skipped = report.result("task-2").ok_or("missing task-2")?;
    assert_eq!(skipped.status, TaskStatus::Skipped);
    assert!(skipped.error.as_deref().unwrap_or_default().contains("task-1"));
    assert_eq!(skipped.started_at, None);
    assert_eq!(invoker.attempts_for("task-2"), 0);
    assert_eq!(listener.statuses_of("task-2"), vec![TaskStatus::Skipped]);

    assert_eq!(report.status_of("task-3"), Some(TaskStatus::Completed));
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.skipped, 1);
    Ok(())
}

#[tokio::test]
async fn failure_cascades_transitively() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new().fail("task-1", "down");
    let plan = PlanBuilder::new()
        .with_task(TaskBuilder::search("task-1").build())
        .with_task(TaskBuilder::search("task-2").after("task-1").build())
        .with_task(TaskBuilder::search("task-3").after("task-2").build())
        .with_task(TaskBuilder::search("task-4").after("task-1").after("task-5").build())
        .with_task(TaskBuilder::search("task-5").build())
        .build();

    let report = with_timeout(engine(&invoker, 3).execute(&plan, NoopListener)).await?;

    for id in ["task-2", "task-3", "task-4"] {
        assert_eq!(report.status_of(id), Some(TaskStatus::Skipped), "{id}");
        assert_eq!(invoker.attempts_for(id), 0);
    }
    let third = report.result("task-3").ok_or("missing task-3")?;
    assert!(third.error.as_deref().unwrap_or_default().contains("task-2"));
    let fourth = report.result("task-4").ok_or("missing task-4")?;
    assert!(fourth.error.as_deref().unwrap_or_default().contains("task-1"));

    assert_eq!(report.status_of("task-5"), Some(TaskStatus::Completed));
    assert_eq!(report.results.len(), 5);
    Ok(())
}

#[tokio::test]
async fn cyclic_plan_terminates_and_skips_the_cycle() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new();
    let plan = PlanBuilder::new()
        .with_task(TaskBuilder::search("task-1").after("task-2").build())
        .with_task(TaskBuilder::search("task-2").after("task-1").build())
        .with_task(TaskBuilder::search("task-3").build())
        .with_task(TaskBuilder::search("task-4").after("task-1").build())
        .build();

    let report = with_timeout(engine(&invoker, 3).execute(&plan, NoopListener)).await?;

    let cycle = report.cycle.as_ref().ok_or("cycle not reported")?;
    assert_eq!(cycle.unresolved, vec!["task-1", "task-2", "task-4"]);
    assert_eq!(report.order, vec!["task-3", "task-1", "task-2", "task-4"]);

    assert_eq!(report.status_of("task-3"), Some(TaskStatus::Completed));
    for id in ["task-1", "task-2", "task-4"] {
        assert_eq!(report.status_of(id), Some(TaskStatus::Skipped), "{id}");
    }
    assert_eq!(invoker.call_order(), vec!["task-3"]);
    Ok(())
}

#[tokio::test]
async fn concurrency_ceiling_is_respected() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new().with_delay(Duration::from_millis(20));
    let report = with_timeout(engine(&invoker, 3).execute(&independent_plan(10), NoopListener)).await?;

    assert_eq!(report.summary.completed, 10);
    assert_eq!(invoker.call_count(), 10);
    assert_eq!(invoker.max_in_flight(), 3);
    Ok(())
}

#[tokio::test]
async fn ready_tasks_dispatch_in_plan_order() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new();
    with_timeout(engine(&invoker, 1).execute(&independent_plan(5), NoopListener)).await?;

    assert_eq!(
        invoker.call_order(),
        vec!["task-1", "task-2", "task-3", "task-4", "task-5"]
    );
    Ok(())
}

#[tokio::test]
async fn second_run_is_served_from_cache() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new();
    let engine = engine(&invoker, 3);
    let plan = chain_plan(3);

    let first = with_timeout(engine.execute(&plan, NoopListener)).await?;
    assert_eq!(invoker.call_count(), 3);
    assert_eq!(first.summary.cached, 0);

    let second = with_timeout(engine.execute(&plan, NoopListener)).await?;
    assert_eq!(invoker.call_count(), 3, "cache hit must not invoke the tool");
    assert_eq!(second.summary.cached, 3);
    for r in second.results.values() {
        assert_eq!(r.status, TaskStatus::Completed);
        assert_eq!(r.attempts, 0);
        assert_eq!(r.result, first.result(&r.task_id).and_then(|f| f.result.clone()));
    }
    Ok(())
}

#[tokio::test]
async fn transient_failures_are_retried_with_notices() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new().script("task-1", Script::FailTimes(2, json!("ok")));
    let listener = RecordingListener::new();
    let plan = PlanBuilder::new()
        .with_task(TaskBuilder::search("task-1").build())
        .build();

    let report = with_timeout(engine(&invoker, 3).execute(&plan, listener.clone())).await?;

    let result = report.result("task-1").ok_or("missing task-1")?;
    assert_eq!(result.status, TaskStatus::Completed);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.result, Some(json!("ok")));

    let retries = listener.retries();
    assert_eq!(retries.len(), 2);
    assert_eq!(retries[0].attempt, 1);
    assert_eq!(retries[1].attempt, 2);
    assert!(retries[0].next_delay < retries[1].next_delay);
    assert_eq!(
        listener.statuses_of("task-1"),
        vec![TaskStatus::Running, TaskStatus::Completed]
    );
    Ok(())
}

#[tokio::test]
async fn panicking_tool_call_becomes_a_failed_result() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new().script("task-1", Script::Panic);
    let plan = PlanBuilder::new()
        .with_task(TaskBuilder::search("task-1").build())
        .with_task(TaskBuilder::search("task-2").after("task-1").build())
        .build();

    let report = with_timeout(engine(&invoker, 3).execute(&plan, NoopListener)).await?;

    let failed = report.result("task-1").ok_or("missing task-1")?;
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.as_deref().unwrap_or_default().contains("aborted"));
    assert_eq!(report.status_of("task-2"), Some(TaskStatus::Skipped));
    Ok(())
}

#[tokio::test]
async fn missing_required_argument_fails_without_calling_the_tool() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new();
    let plan = PlanBuilder::new()
        .with_task(
            TaskBuilder::new("task-1", ToolKind::Weather)
                .without_param("city")
                .build(),
        )
        .build();

    let report = with_timeout(engine(&invoker, 3).execute(&plan, NoopListener)).await?;

    let failed = report.result("task-1").ok_or("missing task-1")?;
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.attempts, 0);
    assert!(failed.error.as_deref().unwrap_or_default().contains("city"));
    assert_eq!(invoker.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn malformed_references_are_dropped_and_reported() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new();
    let plan = PlanBuilder::new()
        .with_task(TaskBuilder::search("task-1").build())
        .with_task(
            TaskBuilder::search("task-2")
                .after("task-99")
                .after("task-2")
                .after("task-1")
                .after("task-1")
                .build(),
        )
        .with_task(TaskBuilder::search("task-1").param("query", "shadowed").build())
        .build();

    let report = with_timeout(engine(&invoker, 3).execute(&plan, NoopListener)).await?;

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.summary.completed, 2);
    assert_eq!(invoker.call_order(), vec!["task-1", "task-2"]);
    assert!(report.diagnostics.contains(&PlanIssue::DanglingDependency {
        task: "task-2".into(),
        dependency: "task-99".into(),
    }));
    assert!(report.diagnostics.contains(&PlanIssue::SelfDependency { task: "task-2".into() }));
    assert!(report.diagnostics.contains(&PlanIssue::DuplicateDependency {
        task: "task-2".into(),
        dependency: "task-1".into(),
    }));
    assert!(report.diagnostics.contains(&PlanIssue::DuplicateTaskId { task: "task-1".into() }));
    Ok(())
}

#[tokio::test]
async fn empty_plan_finishes_immediately() -> TestResult {
    init_tracing();

    let invoker = ScriptedInvoker::new();
    let report =
        with_timeout(engine(&invoker, 3).execute(&PlanBuilder::new().build(), NoopListener)).await?;

    assert!(report.results.is_empty());
    assert!(report.cycle.is_none());
    assert!(report.is_success());
    Ok(())
}
