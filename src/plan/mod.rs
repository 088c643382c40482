// src/plan/mod.rs

//! Plan data model: what the plan producer hands us ([`model`]), what the
//! engine hands back ([`result`]), and loading plans from disk ([`loader`]).

pub mod loader;
pub mod model;
pub mod result;

pub use loader::{load_plan, parse_plan_json, parse_plan_toml};
pub use model::{ParamMap, Plan, Task};
pub use result::{RetryNotice, TaskResult, TaskStatus, TaskUpdate};
