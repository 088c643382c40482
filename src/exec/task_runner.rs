// src/exec/task_runner.rs

//! Single-task execution: resolve, check cache, invoke with retries, store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::{DEFAULT_TTL, ResultCache, task_fingerprint};
use crate::dag::DependencyResults;
use crate::errors::{TaskError, ToolError};
use crate::exec::resolver::ParameterResolver;
use crate::exec::retry::RetryPolicy;
use crate::plan::{RetryNotice, Task, TaskResult};
use crate::tools::{ToolCall, ToolInvoker};

/// Callback invoked between two attempts of the same tool call.
pub type RetryHook<'a> = &'a (dyn Fn(RetryNotice) + Send + Sync);

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes one task end to end.
///
/// [`TaskRunner::run`] always returns a [`TaskResult`]; every error on the
/// way (resolution, missing arguments, exhausted retries) becomes a `failed`
/// result. Cache problems are logged and otherwise ignored.
#[derive(Clone)]
pub struct TaskRunner {
    invoker: Arc<dyn ToolInvoker>,
    cache: Arc<dyn ResultCache>,
    resolver: Arc<dyn ParameterResolver>,
    retry: RetryPolicy,
    call_timeout: Duration,
    cache_ttl: Duration,
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("cache", &self.cache.backend())
            .field("retry", &self.retry)
            .field("call_timeout", &self.call_timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

/// Successful execution, before it is turned into a result.
struct Success {
    payload: Value,
    cached: bool,
}

impl TaskRunner {
    pub fn new(
        invoker: Arc<dyn ToolInvoker>,
        cache: Arc<dyn ResultCache>,
        resolver: Arc<dyn ParameterResolver>,
    ) -> Self {
        Self {
            invoker,
            cache,
            resolver,
            retry: RetryPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            cache_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run a task without retry notifications.
    pub async fn run(&self, task: &Task, dependencies: &DependencyResults) -> TaskResult {
        self.run_with_hook(task, dependencies, &|_| {}).await
    }

    /// Run a task, calling `on_retry` before each backoff delay.
    pub async fn run_with_hook(
        &self,
        task: &Task,
        dependencies: &DependencyResults,
        on_retry: RetryHook<'_>,
    ) -> TaskResult {
        let started_at = Utc::now();
        let mut attempts = 0u32;

        let mut result = match self.execute(task, dependencies, on_retry, &mut attempts).await {
            Ok(success) => {
                let mut r = TaskResult::completed(task.id.clone(), started_at, success.payload);
                r.cached = success.cached;
                r
            }
            Err(err) => {
                error!(task = %task.id, tool = %task.tool, attempts, error = %err, "task failed");
                TaskResult::failed(task.id.clone(), started_at, err.to_string())
            }
        };
        result.attempts = attempts;
        result
    }

    async fn execute(
        &self,
        task: &Task,
        dependencies: &DependencyResults,
        on_retry: RetryHook<'_>,
        attempts: &mut u32,
    ) -> Result<Success, TaskError> {
        // 1. Parameters. Input errors are final: no retry.
        let args = self.resolver.resolve(task, dependencies).await?;
        let call = ToolCall::from_args(task.tool, &args)?;

        // 2. Cache lookup on the minimal identity of the call.
        let key = task_fingerprint(&call, &task.description);
        match self.cache.get(&key).await {
            Ok(Some(payload)) => {
                info!(task = %task.id, tool = %task.tool, key = %key, "cache hit; skipping tool call");
                return Ok(Success {
                    payload,
                    cached: true,
                });
            }
            Ok(None) => debug!(task = %task.id, key = %key, "cache miss"),
            Err(err) => {
                warn!(task = %task.id, key = %key, error = %err, "cache read failed; treating as miss")
            }
        }

        // 3. Invoke with bounded retries.
        let payload = self.invoke_with_retry(task, &call, on_retry, attempts).await?;

        // 4. Store.
        if let Err(err) = self.cache.set(&key, payload.clone(), self.cache_ttl).await {
            warn!(task = %task.id, key = %key, error = %err, "cache write failed; continuing");
        }

        Ok(Success {
            payload,
            cached: false,
        })
    }

    async fn invoke_with_retry(
        &self,
        task: &Task,
        call: &ToolCall,
        on_retry: RetryHook<'_>,
        attempts: &mut u32,
    ) -> Result<Value, TaskError> {
        loop {
            *attempts += 1;
            let attempt = *attempts;
            debug!(task = %task.id, tool = %call.kind(), attempt, "invoking tool");

            let outcome =
                match tokio::time::timeout(self.call_timeout, self.invoker.invoke(call)).await {
                    Ok(res) => res,
                    Err(_) => Err(ToolError::Timeout(self.call_timeout)),
                };

            let err = match outcome {
                Ok(payload) => {
                    info!(task = %task.id, tool = %call.kind(), attempt, "tool call succeeded");
                    return Ok(payload);
                }
                Err(err) => err,
            };

            let delay = if err.is_retryable() {
                self.retry.delay_after(attempt)
            } else {
                None
            };
            let Some(delay) = delay else {
                return Err(TaskError::Exhausted {
                    tool: call.kind(),
                    attempts: attempt,
                    last: err,
                });
            };

            warn!(
                task = %task.id,
                tool = %call.kind(),
                attempt,
                max_attempts = self.retry.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "tool call failed; retrying after backoff"
            );
            on_retry(RetryNotice {
                task_id: task.id.clone(),
                attempt,
                max_attempts: self.retry.max_attempts,
                next_delay: delay,
                error: err.to_string(),
            });
            tokio::time::sleep(delay).await;
        }
    }
}
