// src/engine/mod.rs

//! Orchestration engine for plandag.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the progress listener (status stream for the result consumer)
//! - the main runtime event loop that reacts to:
//!   - task completion events
//!   - retry notices from in-flight tasks
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]; [`execute`] is the one-call entry point.

use crate::plan::{RetryNotice, TaskResult};

/// Events flowing into the runtime from executors.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A dispatched task reached a terminal state.
    TaskCompleted { result: TaskResult },
    /// An attempt failed and the task is about to back off and retry.
    TaskRetrying(RetryNotice),
}

pub mod core;
pub mod event_handlers;
pub mod execute;
pub mod listener;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use execute::{Engine, EngineOptions, ExecutionReport, PlanCheck, ReportSummary};
pub use listener::{NoopListener, ProgressListener};
pub use runtime::Runtime;
