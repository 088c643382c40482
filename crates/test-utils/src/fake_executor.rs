use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::mpsc;
use plandag::dag::ScheduledTask;
use plandag::engine::RuntimeEvent;
use plandag::errors::{PlandagError, Result};
use plandag::exec::ExecutorBackend;
use plandag::plan::TaskResult;
use plandag::types::BoxFuture;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - immediately reports a terminal result for each scheduled task: failed
///   if its id was registered with [`FakeExecutor::failing`], completed
///   with `{"id": ...}` otherwise.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failures: HashMap<String, String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failures: HashMap::new(),
        }
    }

    pub fn failing(mut self, id: &str, error: &str) -> Self {
        self.failures.insert(id.to_string(), error.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for t in tasks {
                let id = t.id().to_string();
                executed.lock().unwrap().push(id.clone());

                let result = match self.failures.get(&id) {
                    Some(err) => TaskResult::failed(id, t.dispatched_at, err.clone()),
                    None => {
                        let payload = json!({ "id": id });
                        TaskResult::completed(id, t.dispatched_at, payload)
                    }
                };

                tx.send(RuntimeEvent::TaskCompleted { result })
                    .await
                    .map_err(|e| PlandagError::Other(anyhow::Error::from(e)))?;
            }
            Ok(())
        })
    }
}
