// src/plan/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::{PlandagError, Result};
use crate::plan::model::Plan;

/// Load a plan from disk.
///
/// Files ending in `.json` are parsed as JSON (the shape plan producers
/// usually emit); everything else is parsed as TOML.
///
/// No graph validation happens here: a plan with dangling references or a
/// cycle still loads, and the engine reports those problems when it runs.
pub fn load_plan(path: impl AsRef<Path>) -> Result<Plan> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let plan = if is_json {
        parse_plan_json(&contents)?
    } else {
        parse_plan_toml(&contents)?
    };

    debug!(path = ?path, tasks = plan.tasks.len(), "loaded plan");
    ensure_non_empty_ids(&plan)?;
    Ok(plan)
}

pub fn parse_plan_json(contents: &str) -> Result<Plan> {
    Ok(serde_json::from_str(contents)?)
}

pub fn parse_plan_toml(contents: &str) -> Result<Plan> {
    Ok(toml::from_str(contents)?)
}

fn ensure_non_empty_ids(plan: &Plan) -> Result<()> {
    if let Some(pos) = plan.tasks.iter().position(|t| t.id.trim().is_empty()) {
        return Err(PlandagError::PlanError(format!(
            "task #{} has an empty id",
            pos + 1
        )));
    }
    Ok(())
}
