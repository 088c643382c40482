// src/dag/mod.rs

//! Dependency graph, validation and scheduling.
//!
//! - [`graph`] builds a sanitised dependency graph from a plan's tasks.
//! - [`validate`] computes a Kahn ordering and cycle diagnostics.
//! - [`scheduler`] contains the per-plan state machine that decides which
//!   tasks are ready to run, and what happens when one finishes.
//! - [`task_info`] defines the scheduled-task type handed to executors.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod task_info;
pub mod validate;

pub use graph::{DagGraph, PlanIssue};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{DependencyResults, ScheduledTask};
pub use validate::{Validation, fallback_order, numeric_suffix, validate, validate_tasks};
