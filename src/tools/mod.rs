// src/tools/mod.rs

//! Tool layer.
//!
//! - [`ToolKind`] is the closed set of tools a plan may reference.
//! - [`call::ToolCall`] is a validated invocation of one of them.
//! - [`ToolInvoker`] is the single async interface the Task Runner uses to
//!   perform a call, whatever the tool.
//! - [`http::HttpToolInvoker`] is the production invoker, posting each call
//!   to a configured HTTP endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ToolError;
use crate::types::BoxFuture;

pub mod call;
pub mod http;

pub use call::ToolCall;
pub use http::HttpToolInvoker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Search,
    Weather,
    Calculator,
    Stock,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Search,
        ToolKind::Weather,
        ToolKind::Calculator,
        ToolKind::Stock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolKind::Search => "search",
            ToolKind::Weather => "weather",
            ToolKind::Calculator => "calculator",
            ToolKind::Stock => "stock",
        }
    }

    /// The argument a call of this tool cannot do without.
    pub fn required_field(self) -> &'static str {
        match self {
            ToolKind::Search => "query",
            ToolKind::Weather => "city",
            ToolKind::Calculator => "expression",
            ToolKind::Stock => "symbol",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "search" => Ok(ToolKind::Search),
            "weather" => Ok(ToolKind::Weather),
            "calculator" => Ok(ToolKind::Calculator),
            "stock" => Ok(ToolKind::Stock),
            other => Err(format!(
                "unknown tool: {other} (expected search, weather, calculator or stock)"
            )),
        }
    }
}

/// Performs the external call behind a [`ToolCall`].
///
/// Implementations should not retry or time out on their own; the Task
/// Runner owns both policies.
pub trait ToolInvoker: Send + Sync {
    fn invoke<'a>(&'a self, call: &'a ToolCall) -> BoxFuture<'a, Result<Value, ToolError>>;
}
