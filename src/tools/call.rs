// src/tools/call.rs

use serde_json::{Map, Value};

use crate::errors::TaskError;
use crate::plan::ParamMap;
use crate::tools::ToolKind;

/// A validated tool invocation.
///
/// Each variant carries the tool's required argument, already checked to be
/// present, plus whatever other arguments the resolver produced (`extra`).
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Search { query: String, extra: ParamMap },
    Weather { city: String, extra: ParamMap },
    Calculator { expression: String, extra: ParamMap },
    Stock { symbol: String, extra: ParamMap },
}

impl ToolCall {
    /// Build a call from resolved arguments.
    ///
    /// Fails with [`TaskError::MissingParameter`] if the tool's required field
    /// is absent, null or blank. Numeric values are accepted and stringified
    /// (e.g. `expression = 42`).
    pub fn from_args(tool: ToolKind, args: &ParamMap) -> Result<Self, TaskError> {
        let field = tool.required_field();
        let primary = args
            .get(field)
            .and_then(scalar_to_string)
            .filter(|s| !s.trim().is_empty())
            .ok_or(TaskError::MissingParameter { tool, field })?;

        let mut extra = args.clone();
        extra.remove(field);

        Ok(match tool {
            ToolKind::Search => ToolCall::Search {
                query: primary,
                extra,
            },
            ToolKind::Weather => ToolCall::Weather {
                city: primary,
                extra,
            },
            ToolKind::Calculator => ToolCall::Calculator {
                expression: primary,
                extra,
            },
            ToolKind::Stock => ToolCall::Stock {
                symbol: primary,
                extra,
            },
        })
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::Search { .. } => ToolKind::Search,
            ToolCall::Weather { .. } => ToolKind::Weather,
            ToolCall::Calculator { .. } => ToolKind::Calculator,
            ToolCall::Stock { .. } => ToolKind::Stock,
        }
    }

    /// The required argument, as supplied.
    pub fn primary(&self) -> &str {
        match self {
            ToolCall::Search { query, .. } => query,
            ToolCall::Weather { city, .. } => city,
            ToolCall::Calculator { expression, .. } => expression,
            ToolCall::Stock { symbol, .. } => symbol,
        }
    }

    /// The required argument normalised for cache identity.
    ///
    /// Only this value (plus tool name and description) feeds the cache key;
    /// `extra` arguments never do.
    pub fn cache_identity(&self) -> String {
        match self {
            ToolCall::Search { query, .. } => query.trim().to_string(),
            ToolCall::Weather { city, .. } => city.trim().to_lowercase(),
            ToolCall::Calculator { expression, .. } => {
                expression.chars().filter(|c| !c.is_whitespace()).collect()
            }
            ToolCall::Stock { symbol, .. } => symbol.trim().to_uppercase(),
        }
    }

    /// Full JSON argument object sent to the tool.
    pub fn to_args(&self) -> Value {
        let (extra, field) = match self {
            ToolCall::Search { extra, .. }
            | ToolCall::Weather { extra, .. }
            | ToolCall::Calculator { extra, .. }
            | ToolCall::Stock { extra, .. } => (extra, self.kind().required_field()),
        };

        let mut out: Map<String, Value> = extra.clone();
        out.insert(field.to_string(), Value::String(self.primary().to_string()));
        Value::Object(out)
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
