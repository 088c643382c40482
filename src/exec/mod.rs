// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually running dispatched tasks and
//! reporting back to the orchestration runtime via `RuntimeEvent`s.
//!
//! - [`resolver`] turns a task plus its dependencies' payloads into concrete
//!   tool arguments.
//! - [`retry`] holds the attempt/backoff policy.
//! - [`task_runner`] runs one task: resolve, cache lookup, invoke with
//!   retries, cache store.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `RealExecutorBackend` the runtime uses in production, and which tests
//!   can replace with a fake implementation.

pub mod backend;
pub mod resolver;
pub mod retry;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use resolver::{ParameterResolver, TemplateResolver};
pub use retry::RetryPolicy;
pub use task_runner::{RetryHook, TaskRunner};
