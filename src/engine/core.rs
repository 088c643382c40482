// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for reading
//! events from the channel, notifying the listener and handing
//! `ScheduledTask`s to the executor.
//!
//! The core can be unit tested without any Tokio, channels or network.

use std::collections::BTreeMap;

use crate::dag::Scheduler;
use crate::engine::RuntimeEvent;
use crate::engine::event_handlers::{
    CoreStep, handle_start, handle_task_completion, handle_task_retry,
};
use crate::plan::TaskResult;
use crate::types::TaskId;

/// Pure core runtime state. Owns the scheduler and performs no IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    pub fn into_results(self) -> BTreeMap<TaskId, TaskResult> {
        self.scheduler.into_results()
    }

    /// Dispatch the initial ready set. Call once, before any event.
    pub fn start(&mut self) -> CoreStep {
        handle_start(&mut self.scheduler)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted { result } => {
                handle_task_completion(&mut self.scheduler, result)
            }
            RuntimeEvent::TaskRetrying(notice) => handle_task_retry(&self.scheduler, notice),
        }
    }
}
