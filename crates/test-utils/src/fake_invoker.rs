use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use plandag::errors::ToolError;
use plandag::tools::{ToolCall, ToolInvoker};
use plandag::types::BoxFuture;

/// What a scripted call does.
#[derive(Debug, Clone)]
pub enum Script {
    /// Succeed with this payload.
    Succeed(Value),
    /// Fail every attempt with this message.
    Fail(String),
    /// Fail the first `n` attempts, then succeed with the payload.
    FailTimes(u32, Value),
    /// Never return (exercises the per-call timeout).
    Hang,
    /// Panic inside the call.
    Panic,
}

#[derive(Default)]
struct Inner {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<ToolCall>>,
    attempts: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// A fake tool invoker that:
/// - looks up an outcome by the call's primary argument (query, city, ...)
/// - echoes `{"tool": ..., "input": ...}` for unscripted calls
/// - records every call and the peak number of concurrent calls.
///
/// Cheap to clone; clones share state, so a test can keep a handle after
/// giving one to a `TaskRunner`.
#[derive(Clone, Default)]
pub struct ScriptedInvoker {
    inner: Arc<Inner>,
    delay: Duration,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script(self, primary: &str, script: Script) -> Self {
        self.inner
            .scripts
            .lock()
            .unwrap()
            .insert(primary.to_string(), script);
        self
    }

    pub fn succeed(self, primary: &str, payload: Value) -> Self {
        self.script(primary, Script::Succeed(payload))
    }

    pub fn fail(self, primary: &str, message: &str) -> Self {
        self.script(primary, Script::Fail(message.to_string()))
    }

    /// Total calls made, across all arguments.
    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().unwrap().len()
    }

    /// Attempts made for one primary argument.
    pub fn attempts_for(&self, primary: &str) -> u32 {
        self.inner
            .attempts
            .lock()
            .unwrap()
            .get(primary)
            .copied()
            .unwrap_or(0)
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.inner.calls.lock().unwrap().clone()
    }

    /// Primary arguments in the order calls started.
    pub fn call_order(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.primary().to_string()).collect()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn echo_payload(call: &ToolCall) -> Value {
        json!({ "tool": call.kind().as_str(), "input": call.primary() })
    }
}

/// Decrements the in-flight counter even if the call panics or is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ToolInvoker for ScriptedInvoker {
    fn invoke<'a>(&'a self, call: &'a ToolCall) -> BoxFuture<'a, Result<Value, ToolError>> {
        Box::pin(async move {
            let primary = call.primary().to_string();
            self.inner.calls.lock().unwrap().push(call.clone());
            let attempt = {
                let mut attempts = self.inner.attempts.lock().unwrap();
                let n = attempts.entry(primary.clone()).or_insert(0);
                *n += 1;
                *n
            };

            let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.inner.in_flight);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let script = self.inner.scripts.lock().unwrap().get(&primary).cloned();
            match script {
                None => Ok(Self::echo_payload(call)),
                Some(Script::Succeed(v)) => Ok(v),
                Some(Script::Fail(msg)) => Err(ToolError::Failed(msg)),
                Some(Script::FailTimes(n, _)) if attempt <= n => {
                    Err(ToolError::Failed(format!("scripted failure {attempt}/{n}")))
                }
                Some(Script::FailTimes(_, v)) => Ok(v),
                Some(Script::Hang) => std::future::pending().await,
                Some(Script::Panic) => panic!("scripted panic for {primary}"),
            }
        })
    }
}
