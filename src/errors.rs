// src/errors.rs

//! Crate-wide error types.
//!
//! Config and plan file problems surface as [`PlandagError`]. A dependency
//! cycle is reported as a [`CycleError`] value next to the results, not as
//! an `Err`. Everything that can go wrong *inside* a single task is a
//! [`TaskError`] and ends up as a `failed` result.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::tools::ToolKind;

#[derive(Error, Debug)]
pub enum PlandagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Plan error: {0}")]
    PlanError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Reported by the graph validator when not every task could be ordered.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error(
    "{} task(s) could not be ordered: [{}]{}",
    .unresolved.len(),
    .unresolved.join(", "),
    render_path(.path)
)]
pub struct CycleError {
    /// Tasks left with unresolved dependencies after the Kahn reduction.
    pub unresolved: Vec<String>,
    /// One concrete cycle, following declared dependency edges. The first id
    /// is repeated at the end (`a -> b -> a`).
    pub path: Option<Vec<String>>,
}

fn render_path(path: &Option<Vec<String>>) -> String {
    match path {
        Some(p) => format!("; cycle: {}", p.join(" -> ")),
        None => String::new(),
    }
}

/// Failure of a single tool invocation attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("no endpoint configured for tool '{0}'")]
    NotConfigured(ToolKind),

    #[error("tool call timed out after {0:?}")]
    Timeout(Duration),

    #[error("tool returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("tool transport error: {0}")]
    Transport(String),

    #[error("tool failed: {0}")]
    Failed(String),
}

impl ToolError {
    /// Whether another attempt could plausibly succeed. A missing endpoint
    /// stays missing for the whole run.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ToolError::NotConfigured(_))
    }
}

/// Failure of the parameter resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("reference to '{0}' which is not a completed dependency")]
    UnknownReference(String),

    #[error("field '{field}' not found in result of '{task}'")]
    MissingField { task: String, field: String },
}

/// Everything that can turn a task into a `failed` result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("missing required parameter '{field}' for {tool} task")]
    MissingParameter { tool: ToolKind, field: &'static str },

    #[error("parameter resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("{tool} failed after {attempts} attempt(s): {last}")]
    Exhausted {
        tool: ToolKind,
        attempts: u32,
        last: ToolError,
    },

    #[error("task execution aborted: {0}")]
    Aborted(String),
}

/// Cache backend errors. These are logged and never fail a task.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("cache payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PlandagError>;
