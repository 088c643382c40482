// src/exec/resolver.rs

//! Parameter resolution: turning a task plus its dependencies' results into
//! concrete tool arguments.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::dag::DependencyResults;
use crate::errors::ResolveError;
use crate::plan::{ParamMap, Task};
use crate::tools::ToolKind;
use crate::types::BoxFuture;

/// Derives concrete arguments for a task.
///
/// The engine treats this as a black box: it may be a template expander, a
/// language model, or anything else. Missing required arguments are checked
/// afterwards by the Task Runner, not here.
pub trait ParameterResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        task: &'a Task,
        dependencies: &'a DependencyResults,
    ) -> BoxFuture<'a, Result<ParamMap, ResolveError>>;
}

/// `{{task-1}}` or `{{task-1.field.0.name}}`.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_-]+)((?:\.[A-Za-z0-9_]+)*)\s*\}\}")
        .expect("placeholder pattern is a valid regex")
});

/// Default resolver.
///
/// - Starts from the task's pre-supplied `parameters`.
/// - Replaces `{{<task-id>}}` / `{{<task-id>.<path>}}` placeholders in any
///   string (nested ones included) with the referenced dependency's payload.
///   A string that is exactly one placeholder takes the referenced value
///   as-is; otherwise strings are inlined verbatim and other values as
///   compact JSON.
/// - A `search` task without a `query` searches for its description.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateResolver;

impl TemplateResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve_now(
        &self,
        task: &Task,
        dependencies: &DependencyResults,
    ) -> Result<ParamMap, ResolveError> {
        let mut params = task.parameters.clone().unwrap_or_default();

        for value in params.values_mut() {
            substitute(value, dependencies)?;
        }

        if task.tool == ToolKind::Search && !has_text(&params, "query") {
            let description = task.description.trim();
            if !description.is_empty() {
                debug!(task = %task.id, "no query supplied; searching for the description");
                params.insert("query".to_string(), Value::String(description.to_string()));
            }
        }

        Ok(params)
    }
}

impl ParameterResolver for TemplateResolver {
    fn resolve<'a>(
        &'a self,
        task: &'a Task,
        dependencies: &'a DependencyResults,
    ) -> BoxFuture<'a, Result<ParamMap, ResolveError>> {
        Box::pin(async move { self.resolve_now(task, dependencies) })
    }
}

fn has_text(params: &ParamMap, field: &str) -> bool {
    match params.get(field) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn substitute(value: &mut Value, deps: &DependencyResults) -> Result<(), ResolveError> {
    match value {
        Value::String(s) => {
            if let Some(replacement) = expand(s, deps)? {
                *value = replacement;
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                substitute(item, deps)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute(item, deps)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Expand placeholders in `s`; `None` if it contains none.
fn expand(s: &str, deps: &DependencyResults) -> Result<Option<Value>, ResolveError> {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    let mut found = false;

    for caps in PLACEHOLDER.captures_iter(s) {
        let Some(whole) = caps.get(0) else { continue };
        found = true;

        let task = &caps[1];
        let path = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let referenced = lookup(deps, task, path)?;

        if whole.start() == 0 && whole.end() == s.len() {
            return Ok(Some(referenced.clone()));
        }

        out.push_str(&s[last..whole.start()]);
        match referenced {
            Value::String(text) => out.push_str(text),
            other => out.push_str(&other.to_string()),
        }
        last = whole.end();
    }

    if !found {
        return Ok(None);
    }
    out.push_str(&s[last..]);
    Ok(Some(Value::String(out)))
}

fn lookup<'a>(
    deps: &'a DependencyResults,
    task: &str,
    path: &str,
) -> Result<&'a Value, ResolveError> {
    let mut current = deps
        .get(task)
        .ok_or_else(|| ResolveError::UnknownReference(task.to_string()))?;

    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| ResolveError::MissingField {
            task: task.to_string(),
            field: path.trim_start_matches('.').to_string(),
        })?;
    }

    Ok(current)
}
