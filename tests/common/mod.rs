#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use plandag::cache::{MemoryCache, ResultCache};
use plandag::engine::{Engine, EngineOptions};
use plandag::exec::{RetryPolicy, TaskRunner, TemplateResolver};
use plandag_test_utils::fake_invoker::ScriptedInvoker;

pub use plandag_test_utils::{init_tracing, with_timeout};

/// Retry quickly so failure paths don't slow the suite down.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::linear(3, Duration::from_millis(5))
}

pub fn runner_with_cache(invoker: &ScriptedInvoker, cache: Arc<dyn ResultCache>) -> TaskRunner {
    TaskRunner::new(
        Arc::new(invoker.clone()),
        cache,
        Arc::new(TemplateResolver::new()),
    )
    .with_retry(fast_retry())
    .with_call_timeout(Duration::from_millis(500))
}

pub fn runner(invoker: &ScriptedInvoker) -> TaskRunner {
    runner_with_cache(invoker, Arc::new(MemoryCache::new()))
}

pub fn engine(invoker: &ScriptedInvoker, max_concurrency: usize) -> Engine {
    Engine::new(
        runner(invoker),
        EngineOptions::default().with_max_concurrency(max_concurrency),
    )
}
