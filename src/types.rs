// src/types.rs

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical task id type used throughout the engine (e.g. `"task-3"`).
pub type TaskId = String;

/// Boxed, sendable future used at the async trait seams (tool invoker,
/// parameter resolver, cache backends, executor backend).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How the delay between retry attempts grows.
///
/// - `Linear`: `base * attempt` (500ms, 1000ms, 1500ms, ...)
/// - `Exponential`: `base * 2^(attempt - 1)` (500ms, 1000ms, 2000ms, ...)
///
/// Both are strictly increasing for any non-zero base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    Linear,
    Exponential,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::Linear
    }
}

impl FromStr for RetryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(RetryStrategy::Linear),
            "exponential" => Ok(RetryStrategy::Exponential),
            other => Err(format!(
                "invalid retry strategy: {other} (expected \"linear\" or \"exponential\")"
            )),
        }
    }
}

/// Which result-cache backend is active for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Process-local map (lost on exit).
    Memory,
    /// Shared store reached over HTTP.
    Remote,
}

impl std::fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendKind::Memory => f.write_str("memory"),
            CacheBackendKind::Remote => f.write_str("remote"),
        }
    }
}
