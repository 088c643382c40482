// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod tools;
pub mod types;

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cache::{CacheSettings, build_cache};
use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default};
use crate::dag::DagGraph;
use crate::engine::{Engine, EngineOptions, ExecutionReport, NoopListener, PlanCheck};
use crate::exec::{RetryPolicy, TaskRunner, TemplateResolver};
use crate::plan::{TaskUpdate, load_plan};
use crate::tools::HttpToolInvoker;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config and plan loading
/// - cache backend selection
/// - tool invoker, resolver and task runner
/// - the engine, with a listener printing progress
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = effective_config(&args)?;

    let plan = load_plan(&args.plan)
        .with_context(|| format!("loading plan from {}", args.plan.display()))?;

    if args.dry_run {
        let graph = DagGraph::from_tasks(&plan.tasks);
        let check = PlanCheck::of_graph(&plan.goal, &graph);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&check)?);
        } else {
            print!("{}", render_dry_run(&graph, &check));
        }
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    let engine = build_engine(&cfg).await?;

    let report = if args.json {
        engine.execute(&plan, NoopListener).await?
    } else {
        engine.execute(&plan, print_update).await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

/// Config file (or defaults) with command-line overrides applied.
pub fn effective_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut cfg = load_or_default(args.config.as_deref()).context("loading configuration")?;
    if let Some(n) = args.max_concurrency {
        cfg.engine.max_concurrency = usize::try_from(n).unwrap_or(usize::MAX);
    }
    Ok(cfg)
}

/// Build an engine from validated config: cache, HTTP tools, default
/// resolver, retry policy.
pub async fn build_engine(cfg: &ConfigFile) -> Result<Engine> {
    let cache = build_cache(&CacheSettings::from_env(&cfg.cache)).await;
    info!(backend = %cache.backend(), "result cache ready");

    let invoker = HttpToolInvoker::new(&cfg.tools)?;
    let runner = TaskRunner::new(Arc::new(invoker), cache, Arc::new(TemplateResolver::new()))
        .with_retry(RetryPolicy::from_config(&cfg.retry))
        .with_call_timeout(cfg.engine.call_timeout())
        .with_cache_ttl(Duration::from_secs(cfg.cache.ttl_secs));

    debug!(?runner, "task runner configured");
    Ok(Engine::new(runner, EngineOptions::from_config(&cfg.engine)))
}

fn print_update(update: &TaskUpdate) {
    match (&update.error, update.status.is_terminal()) {
        (Some(err), _) => println!("[{}] {}: {}", update.status, update.task_id, err),
        (None, true) => println!("[{}] {}", update.status, update.task_id),
        (None, false) => println!("[{}] {} ...", update.status, update.task_id),
    }
}

fn print_summary(report: &ExecutionReport) {
    let s = report.summary;
    println!();
    if !report.goal.is_empty() {
        println!("goal: {}", report.goal);
    }
    println!(
        "{} task(s): {} completed ({} cached), {} failed, {} skipped",
        s.total, s.completed, s.cached, s.failed, s.skipped
    );
    for r in report.ordered_results() {
        if let Some(payload) = &r.result {
            println!("  {} -> {}", r.task_id, payload);
        }
    }
}

/// Human-readable dry-run output.
///
/// Dependencies are listed as the scheduler will see them, i.e. after
/// dangling, self and duplicate references have been dropped.
pub fn render_dry_run(graph: &DagGraph, check: &PlanCheck) -> String {
    let mut out = String::from("plandag dry-run\n");
    if !check.goal.is_empty() {
        let _ = writeln!(out, "  goal: {}", check.goal);
    }

    let _ = writeln!(out, "\norder ({}):", check.order.len());
    for id in &check.order {
        let Some(task) = graph.task(id) else {
            continue;
        };
        let _ = writeln!(out, "  - {id} [{}] {}", task.tool, task.description);
        let deps = graph.dependencies_of(id);
        if !deps.is_empty() {
            let _ = writeln!(out, "      after: {deps:?}");
        }
    }

    if !check.diagnostics.is_empty() {
        let _ = writeln!(out, "\ndiagnostics ({}):", check.diagnostics.len());
        for issue in &check.diagnostics {
            let _ = writeln!(out, "  - {issue}");
        }
    }
    if let Some(cycle) = &check.cycle {
        let _ = writeln!(out, "\ncycle: {cycle}");
    }
    out
}
